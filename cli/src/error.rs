/// Display global error message in unified format
#[derive(Debug)]
pub struct Error(String, Option<String>);

impl Error {
    pub fn new(message: &str, details: Option<&str>) -> Self {
        Error(message.to_string(), details.map(|d| d.to_string()))
    }
}

/// Display the message and details, as sort of a hint
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\n\n{}",
            self.0,
            console::style(self.1.clone().unwrap_or("".into())).dim()
        )
    }
}

impl std::error::Error for Error {}

/// Automatically convert all eyre error reports
///
/// An `Error` wrapped into the report (e.g. with `wrap_err`) is shown as is,
/// any other report is shown by its top-level message with the chain logged.
impl From<eyre::ErrReport> for Error {
    fn from(error: eyre::ErrReport) -> Self {
        error.downcast::<Error>().unwrap_or_else(|err| {
            log::error!("{err:?}");
            Error::new(&err.to_string(), None)
        })
    }
}

impl From<storefront_stacks::DeclarationError> for Error {
    fn from(error: storefront_stacks::DeclarationError) -> Self {
        Error::new(
            "Invalid stack declaration",
            Some(&format!("{error}. Please report a bug.")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn wrapped_error_is_preserved() {
        let report = Err::<(), _>(std::io::Error::other("disk"))
            .wrap_err(Error::new("Failed to write", Some("Check permissions")))
            .unwrap_err();

        let error = Error::from(report);
        assert_eq!(error.0, "Failed to write");
        assert_eq!(error.1.as_deref(), Some("Check permissions"));
    }

    #[test]
    fn plain_report_keeps_its_message() {
        let error = Error::from(eyre::eyre!("Stack is gone"));
        assert_eq!(error.0, "Stack is gone");
        assert_eq!(error.1, None);
    }
}
