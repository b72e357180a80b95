//! Download of the zipped factor files from the Kenneth R. French data
//! library.

use std::io::{Cursor, Read};
use std::time::Duration;

use carhart_primitives::{FactorTables, RawFactorTable};
use carhart_traits::{FactorSource, SourceError};
use tokio::runtime::Runtime;

use crate::{IoError, parse_french_csv};

/// Zipped 3-factor research data (monthly and annual).
pub const THREE_FACTOR_URL: &str =
    "https://mba.tuck.dartmouth.edu/pages/faculty/ken.french/ftp/F-F_Research_Data_Factors_CSV.zip";

/// Zipped momentum factor data (monthly and annual).
pub const MOMENTUM_URL: &str =
    "https://mba.tuck.dartmouth.edu/pages/faculty/ken.french/ftp/F-F_Momentum_Factor_CSV.zip";

const USER_AGENT: &str = concat!("carhart-rs/", env!("CARGO_PKG_VERSION"));

/// Text of the first `.csv` entry in a zip archive.
///
/// # Errors
/// Returns `Zip` if the bytes are not a readable archive, or
/// `MissingArchiveEntry` if no entry has a `.csv` extension.
pub fn extract_csv(archive: &[u8], source_name: &str) -> Result<String, IoError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if !entry.name().to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        tracing::debug!(
            source = source_name,
            entry = entry.name(),
            bytes = text.len(),
            "extracted factor file"
        );
        return Ok(text);
    }

    Err(IoError::MissingArchiveEntry(source_name.to_string()))
}

/// Factor source fetching the two archives over HTTP on every call.
///
/// Like [`YahooPriceSource`](crate::YahooPriceSource), it owns a tokio
/// runtime so the batch can stay synchronous.
pub struct FrenchLibrarySource {
    client: reqwest::Client,
    runtime: Runtime,
    three_factor_url: String,
    momentum_url: String,
}

impl std::fmt::Debug for FrenchLibrarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrenchLibrarySource")
            .field("three_factor_url", &self.three_factor_url)
            .field("momentum_url", &self.momentum_url)
            .finish_non_exhaustive()
    }
}

impl FrenchLibrarySource {
    /// Fetch from the published library URLs.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or runtime cannot be created.
    pub fn new() -> Result<Self, IoError> {
        Self::with_urls(THREE_FACTOR_URL, MOMENTUM_URL)
    }

    /// Fetch from mirrors of the two archives.
    ///
    /// # Errors
    /// Returns an error if the HTTP client or runtime cannot be created.
    pub fn with_urls(
        three_factor_url: impl Into<String>,
        momentum_url: impl Into<String>,
    ) -> Result<Self, IoError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            client,
            runtime,
            three_factor_url: three_factor_url.into(),
            momentum_url: momentum_url.into(),
        })
    }

    /// URL of the 3-factor archive.
    #[must_use]
    pub fn three_factor_url(&self) -> &str {
        &self.three_factor_url
    }

    /// URL of the momentum archive.
    #[must_use]
    pub fn momentum_url(&self) -> &str {
        &self.momentum_url
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, IoError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IoError::HttpStatus { url: url.to_string(), status: status.as_u16() });
        }
        let bytes = response.bytes().await?;
        tracing::info!(%url, bytes = bytes.len(), "downloaded factor archive");
        Ok(bytes.to_vec())
    }

    fn fetch_table(&self, url: &str) -> Result<RawFactorTable, IoError> {
        let archive = self.runtime.block_on(self.download(url))?;
        let text = extract_csv(&archive, url)?;
        parse_french_csv(&text, url)
    }
}

impl FactorSource for FrenchLibrarySource {
    fn fetch_factors(&self) -> Result<FactorTables, SourceError> {
        let three_factor = self.fetch_table(&self.three_factor_url)?;
        let momentum = self.fetch_table(&self.momentum_url)?;
        Ok(FactorTables::new(three_factor, momentum))
    }

    fn name(&self) -> &str {
        "french-library"
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::TcpListener;

    use super::*;

    const THREE_FACTOR_TEXT: &str = "\
This file was created by CMPT_ME_BEME_RETS using the 202312 CRSP database.

,Mkt-RF,SMB,HML,RF
202310,   -3.19,   -3.87,    0.19,    0.47
202311,    8.84,   -0.02,    1.66,    0.44

 Annual Factors: January-December
,Mkt-RF,SMB,HML,RF
2023,   21.69,  -3.48,  -13.69,    5.01
";

    const MOMENTUM_TEXT: &str = "\
This file was created by CMPT_ME_PRIOR_RETS using the 202312 CRSP database.

,Mom
202310,    1.82
202311,   -5.52

Copyright 2024 Kenneth R. French
";

    fn zipped(entry: &str, text: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        writer.start_file(entry, options).unwrap();
        writer.write_all(text.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    /// Serve fixed bodies by request path on a local port, one connection per
    /// request, until `requests` have been answered.
    fn serve(routes: Vec<(&'static str, u16, Vec<u8>)>, requests: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        std::thread::spawn(move || {
            for stream in listener.incoming().take(requests) {
                let mut stream = stream.unwrap();
                let mut request = Vec::new();
                let mut buf = [0_u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut buf).unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or_default().to_string();
                let (status, body) = routes
                    .iter()
                    .find(|(p, _, _)| *p == path)
                    .map_or((404, Vec::new()), |(_, s, b)| (*s, b.clone()));
                let head = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                stream.write_all(head.as_bytes()).unwrap();
                stream.write_all(&body).unwrap();
            }
        });
        base
    }

    #[test]
    fn extracts_csv_entry() {
        let archive = zipped("F-F_Research_Data_Factors.CSV", THREE_FACTOR_TEXT);
        let text = extract_csv(&archive, "ff3").unwrap();
        assert_eq!(text, THREE_FACTOR_TEXT);
    }

    #[test]
    fn archive_without_csv_is_error() {
        let archive = zipped("README.txt", "nothing here");
        let err = extract_csv(&archive, "ff3").unwrap_err();
        assert!(matches!(err, IoError::MissingArchiveEntry(name) if name == "ff3"));
    }

    #[test]
    fn corrupt_archive_is_zip_error() {
        let err = extract_csv(b"not a zip archive", "ff3").unwrap_err();
        assert!(matches!(err, IoError::Zip(_)));
    }

    #[test]
    fn downloads_and_parses_both_archives() {
        let base = serve(
            vec![
                ("/ff3.zip", 200, zipped("F-F_Research_Data_Factors.CSV", THREE_FACTOR_TEXT)),
                ("/mom.zip", 200, zipped("F-F_Momentum_Factor.csv", MOMENTUM_TEXT)),
            ],
            2,
        );
        let source =
            FrenchLibrarySource::with_urls(format!("{base}/ff3.zip"), format!("{base}/mom.zip"))
                .unwrap();

        let tables = source.fetch_factors().unwrap();
        assert_eq!(tables.three_factor.columns, vec!["Mkt-RF", "SMB", "HML", "RF"]);
        assert_eq!(tables.three_factor.rows[1].key, "202311");
        assert_eq!(tables.three_factor.first_invalid_row(), Some(2));
        assert_eq!(tables.momentum.columns, vec!["Mom".to_string()]);
        assert_eq!(tables.momentum.rows[1].values, vec![Some(-5.52)]);
        assert_eq!(source.name(), "french-library");
    }

    #[test]
    fn missing_archive_is_unreachable() {
        let base = serve(vec![], 1);
        let source =
            FrenchLibrarySource::with_urls(format!("{base}/ff3.zip"), format!("{base}/mom.zip"))
                .unwrap();

        let err = source.fetch_factors().unwrap_err();
        assert!(matches!(err, SourceError::Unreachable(ref msg) if msg.contains("404")));
    }

    #[test]
    fn default_urls_point_at_the_library() {
        let source = FrenchLibrarySource::new().unwrap();
        assert_eq!(source.three_factor_url(), THREE_FACTOR_URL);
        assert!(source.momentum_url().ends_with("F-F_Momentum_Factor_CSV.zip"));
    }
}
