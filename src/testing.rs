use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use crate::transport::{parse_header_block, Headers, HttpRequest, RawResponse, Transport};
use crate::Result;

/// Replays canned responses and remembers every request it was given.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    responses: RefCell<VecDeque<RawResponse>>,
    requests: RefCell<Vec<HttpRequest>>,
}

impl RecordingTransport {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn respond(self, status: u16, body: &str) -> Self {
        self.respond_with_headers(status, body, "")
    }

    /// `header_block` is the raw header section, status line included.
    pub(crate) fn respond_with_headers(
        self,
        status: u16,
        body: &str,
        header_block: &str,
    ) -> Self {
        self.responses.borrow_mut().push_back(RawResponse {
            status,
            headers: parse_header_block(header_block),
            body: body.as_bytes().to_vec(),
        });
        self
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }
}

impl Transport for RecordingTransport {
    fn execute(&self, request: HttpRequest) -> Result<RawResponse> {
        self.requests.borrow_mut().push(request);
        Ok(self.responses.borrow_mut().pop_front().unwrap_or(RawResponse {
            status: 200,
            headers: Headers::new(),
            body: b"{}".to_vec(),
        }))
    }
}

/// Query pairs of `request`, decoded.
pub(crate) fn query_pairs(request: &HttpRequest) -> HashMap<String, String> {
    request.url.query_pairs().into_owned().collect()
}
