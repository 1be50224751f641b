//! Gradio HTTP API client
//!
//! A prediction takes three requests:
//! 1. `POST {prefix}/upload` with the CSV as multipart part `files`
//! 2. `POST {prefix}/call/predict` with `{"data": [file, params...]}`, which
//!    answers with an `event_id`
//! 3. `GET {prefix}/call/predict/{event_id}`, a server-sent event stream that
//!    ends in a `complete` event carrying the output list, or an `error` event

use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use super::{CsvUpload, PredictionService, ServiceError};

/// Endpoint name the services register their function under
const API_NAME: &str = "predict";

pub struct GradioClient {
    http: Client,
    base: Url,
    api_prefix: String,
}

#[derive(Deserialize)]
struct EventHandle {
    event_id: String,
}

impl GradioClient {
    pub fn new(base: Url, api_prefix: &str, timeout: Duration) -> Result<Self, ServiceError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Protocol(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base,
            api_prefix: api_prefix.trim_matches('/').to_string(),
        })
    }

    /// Join path segments onto the base URL under the API prefix
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        let mut path = url.path().trim_end_matches('/').to_string();
        if !self.api_prefix.is_empty() {
            path.push('/');
            path.push_str(&self.api_prefix);
        }
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        url.set_path(&path);
        url.to_string()
    }

    /// Check that the service answers on its API info endpoint
    pub fn ping(&self) -> Result<(), ServiceError> {
        let url = self.endpoint(&["info"]);
        tracing::debug!(%url, "checking service");
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|e| request_failed(&url, e))?;
        check_status(&url, response).map(|_| ())
    }

    fn upload(&self, upload: &CsvUpload) -> Result<String, ServiceError> {
        let url = self.endpoint(&["upload"]);
        tracing::debug!(%url, file = %upload.file_name, "uploading csv");

        let part = multipart::Part::bytes(upload.content.clone().into_bytes())
            .file_name(upload.file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| ServiceError::Protocol(e.to_string()))?;
        let form = multipart::Form::new().part("files", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| request_failed(&url, e))?;
        let paths: Vec<String> = check_status(&url, response)?
            .json()
            .map_err(|e| ServiceError::Protocol(format!("upload response: {}", e)))?;

        paths
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Protocol("upload returned no file path".to_string()))
    }

    fn call(&self, data: Vec<Value>) -> Result<String, ServiceError> {
        let url = self.endpoint(&["call", API_NAME]);
        tracing::debug!(%url, "submitting prediction");

        let response = self
            .http
            .post(&url)
            .json(&json!({ "data": data }))
            .send()
            .map_err(|e| request_failed(&url, e))?;
        let handle: EventHandle = check_status(&url, response)?
            .json()
            .map_err(|e| ServiceError::Protocol(format!("call response: {}", e)))?;

        Ok(handle.event_id)
    }

    fn result(&self, event_id: &str) -> Result<Vec<Value>, ServiceError> {
        let url = self.endpoint(&["call", API_NAME, event_id]);
        tracing::debug!(%url, "awaiting prediction result");

        let response = self.http.get(&url).send().map_err(|e| request_failed(&url, e))?;
        let body = check_status(&url, response)?
            .text()
            .map_err(|e| request_failed(&url, e))?;

        parse_event_stream(&body)
    }
}

impl PredictionService for GradioClient {
    fn predict(&self, upload: &CsvUpload, params: &[Value]) -> Result<Vec<Value>, ServiceError> {
        let path = self.upload(upload)?;

        let mut data = Vec::with_capacity(params.len() + 1);
        data.push(json!({
            "path": path,
            "orig_name": upload.file_name,
            "meta": { "_type": "gradio.FileData" },
        }));
        data.extend_from_slice(params);

        let event_id = self.call(data)?;
        let outputs = self.result(&event_id)?;
        tracing::info!(base = %self.base, outputs = outputs.len(), "prediction complete");
        Ok(outputs)
    }
}

/// Read a Gradio event stream and return the outputs of its `complete` event
pub fn parse_event_stream(body: &str) -> Result<Vec<Value>, ServiceError> {
    let mut event = String::new();
    let mut data = String::new();

    // A trailing blank line guarantees the final event is dispatched
    for line in body.lines().chain(std::iter::once("")) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !event.is_empty() || !data.is_empty() {
                if let Some(outputs) = dispatch(&event, &data)? {
                    return Ok(outputs);
                }
            }
            event.clear();
            data.clear();
        } else if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.trim_start());
        }
    }

    Err(ServiceError::Protocol(
        "event stream ended without a result".to_string(),
    ))
}

fn dispatch(event: &str, data: &str) -> Result<Option<Vec<Value>>, ServiceError> {
    match event {
        "complete" => {
            let value: Value = serde_json::from_str(data)
                .map_err(|e| ServiceError::Protocol(format!("complete event: {}", e)))?;
            match value {
                Value::Array(outputs) => Ok(Some(outputs)),
                other => Ok(Some(vec![other])),
            }
        }
        "error" => {
            let message = match serde_json::from_str::<Value>(data) {
                Ok(Value::String(s)) => s,
                Ok(Value::Null) | Err(_) if data.trim().is_empty() || data.trim() == "null" => {
                    "the service raised an error".to_string()
                }
                Ok(other) => other.to_string(),
                Err(_) => data.to_string(),
            };
            Err(ServiceError::Remote(message))
        }
        // heartbeat, generating, etc.
        _ => Ok(None),
    }
}

fn request_failed(url: &str, err: reqwest::Error) -> ServiceError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    ServiceError::Unreachable {
        url: url.to_string(),
        message,
    }
}

fn check_status(url: &str, response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().unwrap_or_default();
        Err(ServiceError::Http {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}
