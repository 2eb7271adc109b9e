use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use http::Method;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;
use tracing::{debug, warn};

use crate::session::Authorized;
use crate::transport::{ReqwestTransport, Transport};
use crate::{AccessToken, Error, Parameters, Result, Session};

/// Largest file the upload endpoint accepts (150 MiB).
pub const MAX_UPLOAD_SIZE: u64 = 157_286_400;

const METADATA_HEADER: &str = "x-dropbox-metadata";
const CONTENT_TYPE_HEADER: &str = "content-type";

// `/` separates segments and is kept
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Arguments of a metadata listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataOptions {
    /// List the children of a folder.
    pub list: bool,
    /// Maximum number of children returned.
    pub file_limit: Option<u32>,
    /// Hash of a previous listing; unchanged folders answer `304`.
    pub hash: Option<String>,
    pub revision: Option<String>,
    pub include_deleted: bool,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        MetadataOptions {
            list: true,
            file_limit: Some(10_000),
            hash: None,
            revision: None,
            include_deleted: false,
        }
    }
}

impl MetadataOptions {
    fn to_parameters(&self) -> Parameters {
        let mut args = Parameters::new();
        args.insert(
            "file_limit".to_string(),
            self.file_limit.map(|l| l.to_string()),
        );
        args.insert("hash".to_string(), self.hash.clone());
        args.insert("list".to_string(), Some(flag(self.list)));
        args.insert(
            "include_deleted".to_string(),
            Some(flag(self.include_deleted)),
        );
        args.insert("rev".to_string(), self.revision.clone());
        args
    }
}

/// A downloaded file.
#[derive(Debug, Clone)]
pub struct FileDownload {
    /// Local destination when saved, otherwise the remote base name.
    pub name: String,
    /// Value of the `content-type` response header.
    pub mime: Option<String>,
    /// Metadata sent alongside the content, `Value::Null` when absent.
    pub meta: Value,
    pub data: Vec<u8>,
}

/// Dropbox API client over an authorized [`Session`].
#[derive(Debug)]
pub struct Client<T = ReqwestTransport> {
    session: Session<T, Authorized>,
}

impl<T: Transport> Client<T> {
    pub fn new(session: Session<T, Authorized>) -> Self {
        Client { session }
    }

    pub fn session(&self) -> &Session<T, Authorized> {
        &self.session
    }

    pub fn access_token(&self) -> &AccessToken {
        self.session.access_token()
    }

    /// Information about the user's account.
    pub fn account_info(&self) -> Result<Value> {
        let api = &self.session.endpoints().api;
        let response =
            self.session
                .fetch(Method::GET, api, "/account/info", Parameters::new(), false)?;
        Ok(response.body.into_json())
    }

    /// Metadata of a file or folder, with its children when listing.
    pub fn metadata(&self, path: &str, options: &MetadataOptions) -> Result<Value> {
        let api = &self.session.endpoints().api;
        let api_path = format!("/metadata/{}", self.rooted(path));
        debug!(path, "fetching metadata");
        let response =
            self.session
                .fetch(Method::GET, api, &api_path, options.to_parameters(), false)?;
        Ok(response.body.into_json())
    }

    /// Downloads `path`, optionally saving it to `destination`.
    ///
    /// # Errors
    ///
    /// `Error::Api` from the provider, `Error::Io` when `destination`
    /// cannot be written.
    pub fn get_file(
        &self,
        path: &str,
        destination: Option<&Path>,
        revision: Option<&str>,
    ) -> Result<FileDownload> {
        let content = &self.session.endpoints().content;
        let api_path = format!("/files/{}", self.rooted(path));
        let mut args = Parameters::new();
        args.insert(
            "rev".to_string(),
            revision.filter(|r| !r.is_empty()).map(str::to_string),
        );

        let response = self.session.fetch(Method::GET, content, &api_path, args, true)?;
        let mime = response.header(CONTENT_TYPE_HEADER).map(str::to_string);
        let meta = match response.header(METADATA_HEADER) {
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                warn!(error = %e, "undecodable file metadata header");
                Value::Null
            }),
            None => Value::Null,
        };
        let data = response.body.into_bytes();

        let name = match destination {
            Some(destination) => {
                fs::write(destination, &data).map_err(|e| Error::io(destination, e))?;
                debug!(bytes = data.len(), "file saved");
                destination.display().to_string()
            }
            None => base_name(path).to_string(),
        };

        Ok(FileDownload {
            name,
            mime,
            meta,
            data,
        })
    }

    /// Uploads `file` into the remote folder `destination`.
    ///
    /// The remote file is called `name` when given, otherwise it keeps the
    /// local file name.
    ///
    /// # Errors
    ///
    /// `Error::Validation` when `file` is missing or larger than
    /// [`MAX_UPLOAD_SIZE`]; nothing is sent in that case.
    pub fn put_file(
        &self,
        file: &Path,
        destination: &str,
        name: Option<&str>,
        overwrite: bool,
    ) -> Result<Value> {
        let meta = match fs::metadata(file) {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => {
                return Err(Error::Validation(format!(
                    "Local file '{}' is not a regular file",
                    file.display()
                )))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::Validation(format!(
                    "Local file '{}' does not exist",
                    file.display()
                )))
            }
            Err(e) => return Err(Error::io(file, e)),
        };
        if meta.len() > MAX_UPLOAD_SIZE {
            return Err(Error::Validation(format!(
                "File exceeds 150MB upload limit ({} bytes)",
                meta.len()
            )));
        }

        let file_name = match name.filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => local_name(file)?,
        };
        let folder = destination.trim_matches('/');
        let remote = if folder.is_empty() {
            format!("/{}", file_name)
        } else {
            format!("/{}/{}", folder, file_name)
        };

        let content = &self.session.endpoints().content;
        let api_path = format!("/files_put/{}", self.rooted(&remote));
        let mut args = Parameters::new();
        args.insert("overwrite".to_string(), Some(flag(overwrite)));

        debug!(remote = %remote, bytes = meta.len(), "uploading file");
        let response = self.session.put(content, &api_path, args, file, false)?;
        Ok(response.body.into_json())
    }

    /// `path` under the access root, percent-encoded.
    fn rooted(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };
        format!(
            "{}{}",
            self.session.access_type().root(),
            utf8_percent_encode(&path, PATH_SEGMENT)
        )
    }
}

fn flag(value: bool) -> String {
    let flag = if value { "1" } else { "0" };
    flag.to_string()
}

fn base_name(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

fn local_name(file: &Path) -> Result<String> {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::Validation(format!("Local file '{}' has no name", file.display()))
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::testing::{query_pairs, RecordingTransport};
    use crate::transport::RequestBody;
    use crate::{AccessType, Credentials};

    fn client(
        transport: &RecordingTransport,
        access_type: AccessType,
    ) -> Client<&RecordingTransport> {
        let session = Session::with_transport(
            transport,
            Credentials::new("app-key", "app-secret"),
            access_type,
        )
        .authorize(AccessToken {
            token: "access".to_string(),
            token_secret: "access-secret".to_string(),
            uid: "42".to_string(),
        });
        Client::new(session)
    }

    #[test]
    fn account_info_returns_body() {
        let transport =
            RecordingTransport::new().respond(200, r#"{"uid": 42, "country": "JP"}"#);
        let info = client(&transport, AccessType::Dropbox).account_info().unwrap();
        assert_eq!(info, serde_json::json!({"uid": 42, "country": "JP"}));
        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(requests[0].url.path(), "/1/account/info");
        assert_eq!(requests[0].url.host_str(), Some("api.dropbox.com"));
    }

    #[test]
    fn metadata_in_app_folder() {
        let listing = r#"{"path": "/foo", "is_dir": true, "contents": []}"#;
        let transport = RecordingTransport::new().respond(200, listing);
        let body = client(&transport, AccessType::AppFolder)
            .metadata("/foo", &MetadataOptions::default())
            .unwrap();
        assert_eq!(body, serde_json::from_str::<Value>(listing).unwrap());

        let requests = transport.requests();
        let req = &requests[0];
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.url.path(), "/1/metadata/sandbox/foo");
        let query = query_pairs(req);
        assert_eq!(query["file_limit"], "10000");
        assert_eq!(query["list"], "1");
        assert_eq!(query["include_deleted"], "0");
        assert!(!query.contains_key("hash"));
        assert!(!query.contains_key("rev"));
    }

    #[test]
    fn metadata_with_full_access_and_options() {
        let transport = RecordingTransport::new();
        let options = MetadataOptions {
            list: false,
            file_limit: None,
            hash: Some("abc".to_string()),
            revision: Some("7".to_string()),
            include_deleted: true,
        };
        client(&transport, AccessType::Dropbox)
            .metadata("Photos/a b.png", &options)
            .unwrap();

        let requests = transport.requests();
        let req = &requests[0];
        assert_eq!(req.url.path(), "/1/metadata/dropbox/Photos/a%20b.png");
        let query = query_pairs(req);
        assert_eq!(query["list"], "0");
        assert_eq!(query["include_deleted"], "1");
        assert_eq!(query["hash"], "abc");
        assert_eq!(query["rev"], "7");
        assert!(!query.contains_key("file_limit"));
    }

    #[test]
    fn get_file_decodes_side_channel() {
        let transport = RecordingTransport::new().respond_with_headers(
            200,
            "PNGDATA",
            "HTTP/1.1 200 OK\r\n\
             Content-Type: image/png\r\n\
             X-Dropbox-Metadata: {\"size\": \"7 bytes\", \"rev\": \"1\"}\r\n\r\n",
        );
        let file = client(&transport, AccessType::AppFolder)
            .get_file("/pics/test.png", None, Some("1"))
            .unwrap();
        assert_eq!(file.name, "test.png");
        assert_eq!(file.mime.as_deref(), Some("image/png"));
        assert_eq!(file.meta["rev"], "1");
        assert_eq!(file.data, b"PNGDATA".to_vec());

        let requests = transport.requests();
        let req = &requests[0];
        assert!(req.raw);
        assert_eq!(req.url.host_str(), Some("api-content.dropbox.com"));
        assert_eq!(req.url.path(), "/1/files/sandbox/pics/test.png");
        assert_eq!(query_pairs(req)["rev"], "1");
    }

    #[test]
    fn get_file_writes_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("test.png");
        let transport = RecordingTransport::new().respond(200, "PNGDATA");
        let file = client(&transport, AccessType::AppFolder)
            .get_file("/test.png", Some(&dest), None)
            .unwrap();
        assert_eq!(file.name, dest.display().to_string());
        assert_eq!(file.meta, Value::Null);
        assert_eq!(file.mime, None);
        assert_eq!(fs::read(&dest).unwrap(), b"PNGDATA".to_vec());
        assert!(!query_pairs(&transport.requests()[0]).contains_key("rev"));
    }

    #[test]
    fn get_file_unwritable_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing-dir").join("test.png");
        let transport = RecordingTransport::new().respond(200, "PNGDATA");
        let err = client(&transport, AccessType::AppFolder)
            .get_file("/test.png", Some(&dest), None)
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn get_file_not_found() {
        let transport =
            RecordingTransport::new().respond(404, r#"{"error": "File not found"}"#);
        let err = client(&transport, AccessType::AppFolder)
            .get_file("/nope.png", None, None)
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn put_file_over_limit_is_rejected_before_network() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(MAX_UPLOAD_SIZE + 1).unwrap();
        let transport = RecordingTransport::new();
        let err = client(&transport, AccessType::AppFolder)
            .put_file(file.path(), "/", None, true)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn put_file_at_limit_is_sent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(MAX_UPLOAD_SIZE).unwrap();
        let transport = RecordingTransport::new();
        client(&transport, AccessType::AppFolder)
            .put_file(file.path(), "/", None, true)
            .unwrap();
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn put_file_missing_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new();
        let err = client(&transport, AccessType::AppFolder)
            .put_file(&dir.path().join("absent.png"), "/", None, true)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn put_file_keeps_local_name() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("test.png");
        fs::File::create(&local).unwrap().write_all(b"png").unwrap();
        let transport =
            RecordingTransport::new().respond(200, r#"{"path": "/test.png"}"#);
        let meta = client(&transport, AccessType::AppFolder)
            .put_file(&local, "/", None, true)
            .unwrap();
        assert_eq!(meta["path"], "/test.png");

        let requests = transport.requests();
        let req = &requests[0];
        assert_eq!(req.method, Method::PUT);
        assert_eq!(req.url.path(), "/1/files_put/sandbox/test.png");
        assert_eq!(query_pairs(req)["overwrite"], "1");
        match &req.body {
            RequestBody::File(path) => assert_eq!(path, &local),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn put_file_renamed_into_folder() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("test.png");
        fs::File::create(&local).unwrap().write_all(b"png").unwrap();
        let transport = RecordingTransport::new();
        client(&transport, AccessType::Dropbox)
            .put_file(&local, "/Photos/2012/", Some("renamed.png"), false)
            .unwrap();

        let requests = transport.requests();
        let req = &requests[0];
        assert_eq!(req.url.path(), "/1/files_put/dropbox/Photos/2012/renamed.png");
        assert_eq!(query_pairs(req)["overwrite"], "0");
    }

    #[test]
    fn unauthorized_is_reported() {
        let transport =
            RecordingTransport::new().respond(401, r#"{"error":"invalid_token"}"#);
        let err = client(&transport, AccessType::AppFolder)
            .account_info()
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn base_names() {
        assert_eq!(base_name("/pics/test.png"), "test.png");
        assert_eq!(base_name("test.png"), "test.png");
        assert_eq!(base_name("/pics/"), "pics");
    }
}
