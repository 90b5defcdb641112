use smartspeech_core::{ClientError, ValidationError};
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use tonic::codegen::http::Uri;
use tonic::metadata::{Ascii, MetadataKey, MetadataValue};
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tonic::Request;

/// Where to connect and which TLS material to present.
#[derive(Debug, Clone, Default)]
pub struct ConnectionSettings {
    pub host: String,
    pub ca: Option<PathBuf>,
    pub cert: Option<PathBuf>,
    pub key: Option<PathBuf>,
}

/// A validated connection plan. Building one touches neither the network
/// nor the filesystem.
#[derive(Debug, Clone)]
pub struct Connector {
    uri: Uri,
    tls: bool,
    ca: Option<PathBuf>,
    identity: Option<(PathBuf, PathBuf)>,
}

impl Connector {
    pub fn new(settings: &ConnectionSettings) -> Result<Self, ValidationError> {
        let host = settings.host.trim();
        if host.is_empty() {
            return Err(ValidationError::InvalidEndpoint("empty host".to_string()));
        }

        let raw = if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let uri: Uri = raw
            .parse()
            .map_err(|e| ValidationError::InvalidEndpoint(format!("{host}: {e}")))?;
        if uri.host().is_none() {
            return Err(ValidationError::InvalidEndpoint(format!("{host}: missing host")));
        }
        let tls = match uri.scheme_str() {
            Some("https") => true,
            Some("http") => false,
            other => {
                return Err(ValidationError::InvalidEndpoint(format!(
                    "{host}: unsupported scheme {}",
                    other.unwrap_or("")
                )))
            }
        };

        let identity = match (&settings.cert, &settings.key) {
            (Some(cert), Some(key)) => Some((cert.clone(), key.clone())),
            (None, None) => None,
            _ => return Err(ValidationError::IncompleteIdentity),
        };

        Ok(Self {
            uri,
            tls,
            ca: settings.ca.clone(),
            identity,
        })
    }

    async fn tls_config(&self) -> Result<ClientTlsConfig, ClientError> {
        let domain = self.uri.host().unwrap_or_default().to_string();
        let mut config = ClientTlsConfig::new().domain_name(domain);

        config = match &self.ca {
            Some(path) => config.ca_certificate(Certificate::from_pem(
                read_material(path, "CA certificate").await?,
            )),
            None => config.with_native_roots(),
        };

        if let Some((cert, key)) = &self.identity {
            let cert = read_material(cert, "client certificate").await?;
            let key = read_material(key, "private key").await?;
            config = config.identity(Identity::from_pem(cert, key));
        }

        Ok(config)
    }

    /// Load TLS material and open the channel. Everything acquired here is
    /// owned by the returned `Channel` and released when it is dropped.
    pub async fn connect(&self) -> Result<Channel, ClientError> {
        let mut endpoint = Endpoint::from(self.uri.clone());
        if self.tls {
            endpoint = endpoint
                .tls_config(self.tls_config().await?)
                .map_err(transport_error)?;
        }

        tracing::debug!(uri = %self.uri, tls = self.tls, "connecting");
        let channel = endpoint.connect().await.map_err(transport_error)?;
        tracing::info!(uri = %self.uri, "connected");
        Ok(channel)
    }
}

async fn read_material(path: &Path, what: &str) -> Result<Vec<u8>, ClientError> {
    tokio::fs::read(path).await.map_err(|e| {
        ClientError::application(format!("failed to read {what} {}: {e}", path.display()))
    })
}

/// Connection-level failures carry no gRPC status; report them as `Unavailable`
/// with the full cause chain as detail.
pub fn transport_error(err: tonic::transport::Error) -> ClientError {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    ClientError::Transport {
        code: tonic::Code::Unavailable,
        message,
    }
}

/// Headers attached to every call: bearer token plus user-supplied pairs.
#[derive(Debug, Clone, Default)]
pub struct CallMetadata {
    entries: Vec<(MetadataKey<Ascii>, MetadataValue<Ascii>)>,
}

impl CallMetadata {
    /// `pairs` is a flat `[key, value, key, value, ...]` list.
    pub fn new(token: &str, pairs: &[String]) -> Result<Self, ValidationError> {
        if pairs.len() % 2 != 0 {
            return Err(ValidationError::InvalidMetadata(format!(
                "expected key/value pairs, got {} items",
                pairs.len()
            )));
        }

        let mut entries = Vec::with_capacity(pairs.len() / 2 + 1);
        if !token.is_empty() {
            let value = format!("Bearer {token}")
                .parse::<MetadataValue<Ascii>>()
                .map_err(|_| {
                    ValidationError::InvalidMetadata("token is not valid ASCII".to_string())
                })?;
            entries.push((MetadataKey::from_static("authorization"), value));
        }

        for pair in pairs.chunks(2) {
            let (key, value) = (&pair[0], &pair[1]);
            let key = MetadataKey::<Ascii>::from_bytes(key.as_bytes()).map_err(|_| {
                ValidationError::InvalidMetadata(format!("invalid key {key:?}"))
            })?;
            let value = value.parse::<MetadataValue<Ascii>>().map_err(|_| {
                ValidationError::InvalidMetadata(format!("invalid value for {}", key.as_str()))
            })?;
            entries.push((key, value));
        }

        Ok(Self { entries })
    }

    /// Wrap `message` in a request carrying these headers.
    pub fn request<T>(&self, message: T) -> Request<T> {
        let mut request = Request::new(message);
        let metadata = request.metadata_mut();
        for (key, value) in &self.entries {
            metadata.append(key.clone(), value.clone());
        }
        request
    }
}
