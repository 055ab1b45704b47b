use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};

use crate::resource::Representation;

/// Which header carries the resource's `self` URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelfHeader {
    None,
    Location,
    ContentLocation,
}

/// A resource representation on its way out: JSON body plus ETag and,
/// depending on the operation, Location or Content-Location
#[derive(Debug)]
pub struct ResourceResponse {
    representation: Representation,
    status_code: StatusCode,
    self_header: SelfHeader,
}

impl ResourceResponse {
    /// 200 with ETag only
    pub fn ok(representation: Representation) -> Self {
        Self {
            representation,
            status_code: StatusCode::OK,
            self_header: SelfHeader::None,
        }
    }

    /// 201 with `Location: self`
    pub fn created(representation: Representation) -> Self {
        Self {
            representation,
            status_code: StatusCode::CREATED,
            self_header: SelfHeader::Location,
        }
    }

    /// 200 with `Content-Location: self`
    pub fn found(representation: Representation) -> Self {
        Self {
            representation,
            status_code: StatusCode::OK,
            self_header: SelfHeader::ContentLocation,
        }
    }
}

/// Strong entity tag as sent on the wire
pub fn quoted_etag(etag: &str) -> String {
    format!("\"{}\"", etag)
}

impl IntoResponse for ResourceResponse {
    fn into_response(self) -> Response {
        let Representation { body, etag, self_url } = self.representation;
        let mut response = (self.status_code, Json(body)).into_response();
        let headers = response.headers_mut();

        match HeaderValue::from_str(&quoted_etag(&etag)) {
            Ok(value) => {
                headers.insert(header::ETAG, value);
            }
            Err(e) => tracing::error!("Unable to encode etag {:?} as a header: {}", etag, e),
        }

        let self_header = match self.self_header {
            SelfHeader::None => None,
            SelfHeader::Location => Some(header::LOCATION),
            SelfHeader::ContentLocation => Some(header::CONTENT_LOCATION),
        };
        if let Some(name) = self_header {
            match HeaderValue::from_str(&self_url) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(e) => tracing::error!("Unable to encode {} as a header: {}", self_url, e),
            }
        }

        response
    }
}
