use clap::ValueEnum;

/// Which markdown projection of a session to write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// GitHub activity plus tracked issues with nested note bullets
    #[default]
    Simplified,
    /// One numbered section per tracked issue with status, labels and notes
    Detailed,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Simplified => write!(f, "simplified"),
            ReportFormat::Detailed => write!(f, "detailed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format_is_simplified() {
        assert_eq!(ReportFormat::default(), ReportFormat::Simplified);
    }

    #[test]
    fn test_format_display() {
        assert_eq!(ReportFormat::Simplified.to_string(), "simplified");
        assert_eq!(ReportFormat::Detailed.to_string(), "detailed");
    }
}
