//! JSON/XML representation handling.
//!
//! The representation of a response is chosen from `Accept`, then
//! `Content-Type`, then defaults to JSON. Request bodies are parsed by their
//! own `Content-Type`; an XML body carries its fields as attributes of the
//! root element.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::body::{Body, Bytes};
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::de::DeserializeOwned;

use crate::errors::{AppError, Fault};

pub const XML_NAMESPACE: &str = "http://docs.openstack.org/identity/api/v2.0";

const APPLICATION_XML: &str = "application/xml";
const APPLICATION_JSON: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Representation {
    #[default]
    Json,
    Xml,
}

impl Representation {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default()
        };

        let accept = header(ACCEPT);
        if accept.contains(APPLICATION_XML) {
            return Representation::Xml;
        }
        if accept.contains(APPLICATION_JSON) {
            return Representation::Json;
        }
        if header(CONTENT_TYPE).contains(APPLICATION_XML) {
            return Representation::Xml;
        }
        Representation::Json
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Representation::Json => APPLICATION_JSON,
            Representation::Xml => APPLICATION_XML,
        }
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Representation {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Representation::from_headers(&parts.headers))
    }
}

/// A document that knows how to write itself as an XML element.
pub trait XmlDocument {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> quick_xml::Result<()>;
}

/// Serialize `doc` with an XML declaration in front.
pub fn to_xml<D: XmlDocument + ?Sized>(doc: &D) -> quick_xml::Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    doc.write_xml(&mut writer)?;
    Ok(writer.into_inner())
}

pub fn xml_response(status: StatusCode, body: Vec<u8>) -> Response {
    (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_XML))],
        body,
    )
        .into_response()
}

impl XmlDocument for Fault {
    fn write_xml(&self, writer: &mut Writer<Vec<u8>>) -> quick_xml::Result<()> {
        let code = self.code.to_string();
        writer
            .create_element(self.root)
            .with_attribute(("xmlns", XML_NAMESPACE))
            .with_attribute(("code", code.as_str()))
            .write_inner_content(|w| {
                w.create_element("message")
                    .write_text_content(BytesText::new(&self.message))?;
                Ok::<(), quick_xml::Error>(())
            })?;
        Ok(())
    }
}

/// Re-render error responses as XML faults when the client asked for XML.
/// Errors are produced as JSON by `AppError`; the fault travels in the
/// response extensions.
pub async fn render_faults(req: Request, next: Next) -> Response {
    let representation = Representation::from_headers(req.headers());
    let response = next.run(req).await;
    if representation != Representation::Xml {
        return response;
    }
    let Some(fault) = response.extensions().get::<Fault>().cloned() else {
        return response;
    };

    match to_xml(&fault) {
        Ok(xml) => {
            let (mut parts, _) = response.into_parts();
            parts.headers.remove(CONTENT_LENGTH);
            parts
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_XML));
            Response::from_parts(parts, Body::from(xml))
        }
        Err(e) => {
            tracing::error!("failed to render XML fault: {}", e);
            response
        }
    }
}

/// A request document built from the attributes of an XML root element.
pub trait FromXml: Sized {
    fn from_xml(root: &str, attributes: &HashMap<String, String>) -> Result<Self, AppError>;
}

/// Name and attributes of the root element of `xml`. Namespace
/// declarations are dropped.
pub fn root_attributes(xml: &str) -> Result<(String, HashMap<String, String>), AppError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(element) | Event::Empty(element) => {
                let root = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                let mut attributes = HashMap::new();
                for attr in element.attributes() {
                    let attr = attr.map_err(malformed)?;
                    let key = attr.key.as_ref();
                    if key == b"xmlns" || key.starts_with(b"xmlns:") {
                        continue;
                    }
                    let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                    let value = attr.unescape_value().map_err(malformed)?;
                    attributes.insert(name, value.into_owned());
                }
                return Ok((root, attributes));
            }
            Event::Eof => return Err(AppError::BadRequest("empty XML document".into())),
            _ => continue,
        }
    }
}

fn malformed(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(format!("malformed XML: {}", e))
}

/// Body extractor accepting either JSON or XML, by `Content-Type`.
pub struct Payload<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned + FromXml,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_xml = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains("xml"))
            .unwrap_or(false);

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(format!("unreadable body: {}", e)))?;

        if is_xml {
            let text = std::str::from_utf8(&body)
                .map_err(|_| AppError::BadRequest("XML body is not UTF-8".into()))?;
            let (root, attributes) = root_attributes(text)?;
            return T::from_xml(&root, &attributes).map(Payload);
        }

        serde_json::from_slice(&body)
            .map(Payload)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
    }
}
