use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use url::Url;

use crate::{Error, Result};

/// Where a model or label asset lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetLocation {
    Remote(Url),
    File(PathBuf),
}

impl AssetLocation {
    /// `http`/`https` URLs are fetched over the network; `file://` URLs and
    /// plain paths are read from disk.
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                AssetLocation::Remote(url)
            }
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => AssetLocation::File(path),
                Err(()) => AssetLocation::File(PathBuf::from(url.path())),
            },
            _ => AssetLocation::File(PathBuf::from(location)),
        }
    }

    pub fn extension(&self) -> Option<String> {
        let path = match self {
            AssetLocation::Remote(url) => Path::new(url.path()).to_path_buf(),
            AssetLocation::File(path) => path.clone(),
        };
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub async fn fetch(&self) -> Result<Vec<u8>> {
        match self {
            AssetLocation::Remote(url) => {
                let url = url.clone();
                tokio::task::spawn_blocking(move || fetch_http(&url)).await?
            }
            AssetLocation::File(path) => tokio::fs::read(path).await.map_err(|source| Error::Io {
                path: path.clone(),
                source,
            }),
        }
    }
}

impl fmt::Display for AssetLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssetLocation::File(path) => write!(f, "file: {}", path.display()),
            AssetLocation::Remote(url) => write!(f, "url: {}", url),
        }
    }
}

fn fetch_http(url: &Url) -> Result<Vec<u8>> {
    let response = ureq::get(url.as_str()).call().map_err(|err| match err {
        ureq::Error::Status(status, _) => Error::HttpStatus {
            url: url.to_string(),
            status,
        },
        ureq::Error::Transport(transport) => Error::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    })?;

    // ureq only rejects >= 400, anything else outside 2xx is still a failure here
    let status = response.status();
    if !(200..300).contains(&status) {
        return Err(Error::HttpStatus {
            url: url.to_string(),
            status,
        });
    }

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|err| Error::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })?;
    tracing::debug!(%url, len = bytes.len(), "fetched asset");
    Ok(bytes)
}
