use std::fmt;

use serde::Deserialize;

use crate::error::MessageError;

/// Outcome of a single file upload, numbered like the multipart upload codes of CGI servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "i64")]
#[repr(u8)]
pub enum UploadStatus {
    #[default]
    Ok = 0,
    /// the file exceeds the server side size limit
    IniSize = 1,
    /// the file exceeds the size limit declared by the form
    FormSize = 2,
    Partial = 3,
    NoFile = 4,
    NoTmpDir = 6,
    CantWrite = 7,
    /// an extension of the server stopped the upload
    Extension = 8,
}

impl UploadStatus {
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    #[inline]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    pub fn from_code(code: i64) -> Option<Self> {
        let status = match code {
            0 => Self::Ok,
            1 => Self::IniSize,
            2 => Self::FormSize,
            3 => Self::Partial,
            4 => Self::NoFile,
            6 => Self::NoTmpDir,
            7 => Self::CantWrite,
            8 => Self::Extension,
            _ => return None,
        };
        Some(status)
    }

    fn description(self) -> &'static str {
        match self {
            Self::Ok => "upload completed",
            Self::IniSize => "file exceeds the server size limit",
            Self::FormSize => "file exceeds the form size limit",
            Self::Partial => "file was only partially uploaded",
            Self::NoFile => "no file was uploaded",
            Self::NoTmpDir => "missing a temporary folder",
            Self::CantWrite => "failed to write file to disk",
            Self::Extension => "upload stopped by an extension",
        }
    }
}

impl TryFrom<i64> for UploadStatus {
    type Error = MessageError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| MessageError::invalid_argument(format!("unknown upload status code {code}")))
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        for code in [0, 1, 2, 3, 4, 6, 7, 8] {
            assert_eq!(i64::from(UploadStatus::try_from(code).unwrap().code()), code);
        }
        assert!(UploadStatus::try_from(5).unwrap_err().is_invalid_argument());
        assert!(UploadStatus::from_code(-1).is_none());
    }

    #[test]
    fn deserializes_from_number() {
        let status: UploadStatus = serde_json::from_str("4").unwrap();
        assert_eq!(status, UploadStatus::NoFile);
        assert!(serde_json::from_str::<UploadStatus>("9").is_err());
    }

    #[test]
    fn display() {
        assert_eq!(UploadStatus::Partial.to_string(), "file was only partially uploaded (3)");
    }
}
