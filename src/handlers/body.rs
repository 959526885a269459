use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;
use crate::storage::Upload;
use crate::types::Document;

/// Decode a JSON body; an empty body yields the type's default
pub fn parse_json<T: DeserializeOwned + Default>(bytes: &[u8]) -> Result<T, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::invalid_json(format!("Invalid JSON body: {}", e)))
}

/// JSON object body, `{}` when empty
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        Ok(JsonBody(parse_json(&bytes)?))
    }
}

#[derive(Debug)]
pub struct FormFile {
    pub name: String,
    pub upload: Upload,
}

/// Text fields plus attached files, from either a JSON body or `multipart/form-data`.
/// Multipart text fields arrive as strings.
#[derive(Debug, Default)]
pub struct FormBody {
    pub fields: Document,
    pub files: Vec<FormFile>,
}

impl FormBody {
    /// Remove and return the file sent under `name`
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        let index = self.files.iter().position(|f| f.name == name)?;
        Some(self.files.remove(index).upload)
    }

    pub fn into_uploads(self) -> Vec<Upload> {
        self.files.into_iter().map(|f| f.upload).collect()
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false)
}

#[async_trait]
impl<S> FromRequest<S> for FormBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&req) {
            let JsonBody(fields) = JsonBody::<Document>::from_request(req, state).await?;
            return Ok(FormBody {
                fields,
                files: Vec::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;

        let mut form = FormBody::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_type = field
                .file_name()
                .map(|_| field.content_type().unwrap_or("application/octet-stream").to_string());
            let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;

            match file_type {
                Some(content_type) => form.files.push(FormFile {
                    name,
                    upload: Upload::new(bytes.to_vec(), content_type),
                }),
                None => {
                    form.fields
                        .insert(name, Value::from(String::from_utf8_lossy(&bytes).into_owned()));
                }
            }
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;

    #[test]
    fn empty_body_is_default() {
        let doc: Document = parse_json(b"").unwrap();
        assert!(doc.is_empty());

        let spec: FilterSpec = parse_json(b"  \n").unwrap();
        assert!(spec.equals.is_empty());
    }

    #[test]
    fn malformed_body_is_invalid_json() {
        let err = parse_json::<Document>(b"{nope").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.error_code(), "INVALID_JSON");
    }

    #[test]
    fn take_file_matches_by_name() {
        let mut form = FormBody::default();
        form.files.push(FormFile {
            name: "cover".into(),
            upload: Upload::new(b"x".to_vec(), "image/png"),
        });

        assert!(form.take_file("avatar").is_none());
        assert!(form.take_file("cover").is_some());
        assert!(form.files.is_empty());
    }
}
