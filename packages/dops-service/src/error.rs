pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Missing resource: {message}")]
	MissingResource { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
}
impl From<dops_providers::Error> for Error {
	fn from(err: dops_providers::Error) -> Self {
		match err {
			dops_providers::Error::MissingApiKey { message }
			| dops_providers::Error::InvalidConfig { message } => Self::Configuration { message },
			dops_providers::Error::InvalidHeaderName(inner) =>
				Self::Configuration { message: inner.to_string() },
			dops_providers::Error::InvalidHeaderValue(inner) =>
				Self::Configuration { message: inner.to_string() },
			other => Self::Provider { message: other.to_string() },
		}
	}
}

impl From<dops_corpus::Error> for Error {
	fn from(err: dops_corpus::Error) -> Self {
		Self::MissingResource { message: err.to_string() }
	}
}
