//! HTTP server for interactive mode
//!
//! `airisk serve` → starts server, opens browser, shows the dashboard.
//!
//! The server keeps no state between requests. The browser owns its table:
//! it validates an upload, assesses records one request at a time (updating
//! its progress bar after each), then posts the table and results back for
//! the summary and the CSV download.

use crate::aggregate::attach_results;
use crate::assess::{AssessmentResult, Assessor};
use crate::error::{Error, ErrorKind};
use crate::inventory::{validate, AssetRecord, AssetTable, RawTable};
use crate::model::ModelClient;
use crate::report::{self, html, Report};
use serde::{Deserialize, Serialize};
use std::io::Read;
use tiny_http::{Header, Method, Request, Response, Server};

// Embed the UI directly in the binary
const UI_HTML: &str = include_str!("ui.html");

/// Largest request body accepted (uploads included)
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(message.into()) }
    }
}

#[derive(Deserialize, Debug)]
pub struct QueryParams {
    pub query: String,
}

#[derive(Deserialize, Debug)]
struct AssessParams {
    record: AssetRecord,
}

#[derive(Deserialize, Debug)]
struct ReportParams {
    table: AssetTable,
    results: Vec<AssessmentResult>,
}

/// A fully rendered response, independent of the transport
#[derive(Debug)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
    /// Offer the body as a download under this file name
    pub attachment: Option<&'static str>,
}

impl Reply {
    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body, attachment: None }
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let body = serde_json::to_string(value)
            .unwrap_or_else(|e| format!(r#"{{"ok":false,"data":null,"error":"{}"}}"#, e));
        Self { status, content_type: "application/json", body, attachment: None }
    }

    fn ok<T: Serialize>(data: T) -> Self {
        Self::json(200, &ApiResponse::success(data))
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, &ApiResponse::failure(message))
    }

    fn from_error(err: &Error) -> Self {
        let status = match err.kind() {
            ErrorKind::Malformed => 400,
            ErrorKind::Io | ErrorKind::LengthMismatch => 500,
            ErrorKind::MissingRequiredColumns
            | ErrorKind::MissingField
            | ErrorKind::UnexpectedField
            | ErrorKind::DuplicateColumn => 422,
        };
        Self::error(status, err.to_string())
    }

    fn too_large() -> Self {
        Self::error(413, format!("request body exceeds {} bytes", MAX_BODY_BYTES))
    }

    fn not_found() -> Self {
        Self { status: 404, content_type: "text/plain", body: "Not found".to_string(), attachment: None }
    }
}

/// Start server, open browser, serve UI
pub fn start(port: u16, client: &dyn ModelClient, open_browser: bool) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let url = format!("http://localhost:{}", port);

    eprintln!("\n\x1b[1;32m🛡  AIRisk Analysis\x1b[0m");
    eprintln!("   {}\n", url);
    log::info!("Listening on {}", addr);

    if open_browser {
        let _ = open::that(&url);
    }

    let assessor = Assessor::new(client);

    // One request at a time; a batch is driven by the browser
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &assessor) {
            log::error!("Request failed: {}", e);
        }
    }

    Ok(())
}

fn handle_request<C: ModelClient>(mut request: Request, assessor: &Assessor<C>) -> std::io::Result<()> {
    let url = request.url().to_string();
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (url.clone(), None),
    };
    let method = request.method().clone();

    let too_large = request.body_length().map_or(false, |n| n as u64 > MAX_BODY_BYTES);
    let reply = if too_large {
        Reply::too_large()
    } else {
        match read_body(request.as_reader(), MAX_BODY_BYTES)? {
            Ok(body) => {
                log::debug!("{:?} {} ({} bytes)", method, path, body.len());
                route(&method, &path, query.as_deref(), &body, assessor)
            }
            Err(reply) => reply,
        }
    };
    if reply.status == 413 {
        log::warn!("Rejected oversized body for {}", path);
    }

    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(h) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(h);
    }
    if let Some(name) = reply.attachment {
        let value = format!("attachment; filename=\"{}\"", name);
        if let Ok(h) = Header::from_bytes(&b"Content-Disposition"[..], value.as_bytes()) {
            response = response.with_header(h);
        }
    }
    request.respond(response)
}

/// Read a request body of at most `limit` bytes.
///
/// Oversized and non-UTF-8 bodies yield the error reply to send instead of
/// routing. Bodies are never truncated.
fn read_body<R: Read>(reader: R, limit: u64) -> std::io::Result<Result<String, Reply>> {
    let mut bytes = Vec::new();
    reader.take(limit + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > limit {
        return Ok(Err(Reply::too_large()));
    }
    Ok(String::from_utf8(bytes).map_err(|_| Reply::error(400, "request body is not valid UTF-8")))
}

/// Dispatch one request
pub fn route<C: ModelClient>(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &str,
    assessor: &Assessor<C>,
) -> Reply {
    match (method, path) {
        (&Method::Get, "/") => Reply::html(ui_html()),

        // API: check an uploaded CSV against the schema
        (&Method::Post, "/api/validate") => {
            let raw = match RawTable::from_reader(body.as_bytes()) {
                Ok(raw) => raw,
                Err(e) => return Reply::from_error(&e),
            };
            match validate::validate(raw) {
                Ok(validated) => Reply::ok(validated),
                Err(e) => Reply::from_error(&e.into()),
            }
        }

        // API: assess one record
        (&Method::Post, "/api/assess") => {
            let params: AssessParams = match serde_json::from_str(body) {
                Ok(p) => p,
                Err(e) => return Reply::from_error(&e.into()),
            };
            match assessor.assess_record(&params.record) {
                Ok(result) => Reply::ok(result),
                Err(e) => Reply::from_error(&e.into()),
            }
        }

        // API: summary and distributions for an assessed table
        (&Method::Post, "/api/report") => match augment(body) {
            Ok(augmented) => Reply::ok(Report::new(&augmented)),
            Err(e) => Reply::from_error(&e),
        },

        // API: the CSV download
        (&Method::Post, "/api/export") => {
            match augment(body).and_then(|augmented| report::csv::to_string(&augmented)) {
                Ok(csv) => Reply {
                    status: 200,
                    content_type: "text/csv",
                    body: csv,
                    attachment: Some(report::DOWNLOAD_FILE_NAME),
                },
                Err(e) => Reply::from_error(&e),
            }
        }

        // API: free-text question, outside the per-row loop
        (&Method::Get, "/api/query") | (&Method::Post, "/api/query") => {
            match parse_query(query, body) {
                Some(params) => Reply::ok(assessor.ask(&params.query)),
                None => Reply::error(400, "expected a non-empty 'query'"),
            }
        }

        _ => Reply::not_found(),
    }
}

fn augment(body: &str) -> crate::Result<crate::AugmentedTable> {
    let params: ReportParams = serde_json::from_str(body)?;
    params.table.check_shape()?;
    attach_results(&params.table, params.results)
}

fn parse_query(query: Option<&str>, body: &str) -> Option<QueryParams> {
    // Try query string
    let from_url = query.and_then(|q| serde_urlencoded::from_str::<QueryParams>(q).ok());

    // Then JSON body
    let params = from_url.or_else(|| serde_json::from_str::<QueryParams>(body).ok())?;
    if params.query.trim().is_empty() {
        return None;
    }
    Some(params)
}

fn ui_html() -> String {
    UI_HTML
        .replace("{{STYLE}}", html::STYLE_CSS)
        .replace("{{RESULTS}}", html::RESULTS_HTML)
        .replace("{{RENDER_JS}}", html::RENDER_JS)
        .replace("{{DOWNLOAD_NAME}}", report::DOWNLOAD_FILE_NAME)
}
