use std::path::Path;
use url::Url;

mod parser;

pub mod describe;
pub mod error;
pub mod types;

pub use describe::{ElementDescription, OperationDescription, MAX_DEPTH};

/// Parses a WSDL document, and every schema it imports or includes, from a
/// URL or a filesystem path.
pub fn parse<S: AsRef<str>>(url: S) -> Result<types::Definition, error::Error> {
    let url = match Url::parse(url.as_ref()) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => return parse_path(url.as_ref()),
        Err(err) => return Err(err.into()),
    };

    parser::parse(url)
}

pub fn parse_path<P: AsRef<Path>>(path: P) -> Result<types::Definition, error::Error> {
    let path = path
        .as_ref()
        .canonicalize()
        .map_err(|err| error::Error::PathConversionError(Some(err)))?;

    let url = Url::from_file_path(&path).map_err(|()| error::Error::PathConversionError(None))?;
    parser::parse(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_relative_paths() {
        let definition = parse("../tests/fixtures/schema/14.0/AXLAPI.wsdl").unwrap();
        assert!(definition.binding_operation("getPhone").is_some());
    }

    #[test]
    fn test_parse_missing_file() {
        assert!(matches!(
            parse("../tests/fixtures/schema/99.0/AXLAPI.wsdl"),
            Err(error::Error::PathConversionError(Some(_)))
        ));
    }
}
