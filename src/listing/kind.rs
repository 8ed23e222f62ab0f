use serde::{Deserialize, Serialize};
use std::fmt;

/// Short extension tag shown next to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Xlsx,
    Csv,
    Docx,
    Pdf,
    Pptx,
}

impl FileKind {
    /// Derive the tag from a MIME string.
    ///
    /// Matching is by substring, first hit wins: spreadsheet, csv, word,
    /// pdf, presentation. Anything else is reported as `Pdf`; images and
    /// archives are therefore mislabeled (known issue, kept as-is).
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            m if m.contains("spreadsheetml") => Self::Xlsx,
            m if m.contains("csv") => Self::Csv,
            m if m.contains("wordprocessingml") => Self::Docx,
            m if m.contains("pdf") => Self::Pdf,
            m if m.contains("presentationml") => Self::Pptx,
            other => {
                tracing::debug!(mime = other, "unrecognised MIME type, tagging as pdf");
                Self::Pdf
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
            Self::Docx => "docx",
            Self::Pdf => "pdf",
            Self::Pptx => "pptx",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn office_and_text_types() {
        let office = "application/vnd.openxmlformats-officedocument";
        let sheet = format!("{office}.spreadsheetml.sheet");
        let document = format!("{office}.wordprocessingml.document");
        let slides = format!("{office}.presentationml.presentation");

        assert_eq!(FileKind::from_mime(&sheet), FileKind::Xlsx);
        assert_eq!(FileKind::from_mime("text/csv"), FileKind::Csv);
        assert_eq!(FileKind::from_mime(&document), FileKind::Docx);
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime(&slides), FileKind::Pptx);
    }

    #[test]
    fn unknown_types_default_to_pdf() {
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime("application/zip"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime(""), FileKind::Pdf);
    }

    #[test]
    fn priority_order_applies() {
        // spreadsheet beats csv when both appear
        assert_eq!(FileKind::from_mime("text/csv+spreadsheetml"), FileKind::Xlsx);
    }

    #[test]
    fn serializes_as_short_tag() {
        assert_eq!(serde_json::to_string(&FileKind::Pptx).unwrap(), "\"pptx\"");
        assert_eq!(FileKind::Docx.to_string(), "docx");
    }
}
