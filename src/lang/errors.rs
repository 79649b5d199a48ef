use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to set {language} grammar for parser")]
    LanguageSet { language: &'static str },

    #[error("tree-sitter returned no tree for {language} source")]
    ParseFailed { language: &'static str },

    #[error("unsupported source language for {path}")]
    UnsupportedLanguage { path: String },
}
