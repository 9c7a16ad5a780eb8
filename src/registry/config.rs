//! Registry configuration.

use std::time::Duration;

/// Which declaration wins when a name is declared in several imported
/// grammars. The importing file's own declarations always win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImportPrecedence {
    /// Nearest import first; within one depth, declaration order
    #[default]
    FirstImportWins,
    /// Nearest import first; within one depth, reverse declaration order
    LastImportWins,
}

/// Options for a [`GrammarRegistry`](super::GrammarRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Quiet period after the last edit before a file is recomputed
    pub debounce: Duration,
    pub import_precedence: ImportPrecedence,
    /// Report imports of grammars that are not loaded
    pub report_unresolved_imports: bool,
    /// Recompute different files on the rayon pool
    pub parallel: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            import_precedence: ImportPrecedence::FirstImportWins,
            report_unresolved_imports: true,
            parallel: true,
        }
    }
}

impl RegistryConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_import_precedence(mut self, precedence: ImportPrecedence) -> Self {
        self.import_precedence = precedence;
        self
    }

    pub fn with_unresolved_imports(mut self, report: bool) -> Self {
        self.report_unresolved_imports = report;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(300));
        assert_eq!(config.import_precedence, ImportPrecedence::FirstImportWins);
        assert!(config.report_unresolved_imports);
        assert!(config.parallel);
    }

    #[test]
    fn test_builders() {
        let config = RegistryConfig::default()
            .with_debounce(Duration::ZERO)
            .with_import_precedence(ImportPrecedence::LastImportWins)
            .with_unresolved_imports(false)
            .with_parallel(false);
        assert_eq!(config.debounce, Duration::ZERO);
        assert_eq!(config.import_precedence, ImportPrecedence::LastImportWins);
        assert!(!config.report_unresolved_imports);
        assert!(!config.parallel);
    }
}
