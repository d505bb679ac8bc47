use crate::{AccelResult, Error};
use std::{
    io::{self, BufWriter},
    path::PathBuf,
    str::FromStr,
};

/// Where the command line tool writes its output.
/// * "-" and "<out>" are treated as stdout.
/// * "<err>" is treated as stderr.
/// * "<null>" discards everything.
/// * All other strings are treated as file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFile {
    Null,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl OutputFile {
    pub fn as_path_string(&self) -> String {
        match self {
            OutputFile::Null => "<null>".to_string(),
            OutputFile::Stdout => "<stdout>".to_string(),
            OutputFile::Stderr => "<stderr>".to_string(),
            OutputFile::File(path) => path.to_string_lossy().to_string(),
        }
    }

    pub fn isatty(&self) -> bool {
        match self {
            OutputFile::Stdout => atty::is(atty::Stream::Stdout),
            OutputFile::Stderr => atty::is(atty::Stream::Stderr),
            OutputFile::Null | OutputFile::File(_) => false,
        }
    }

    /// Open the stream for writing. Files are truncated.
    pub fn get_write(&self) -> AccelResult<Box<dyn io::Write>> {
        Ok(match self {
            OutputFile::Stdout => Box::new(BufWriter::new(io::stdout())),
            OutputFile::Stderr => Box::new(BufWriter::new(io::stderr())),
            OutputFile::File(path) => {
                let file = std::fs::File::create(path).map_err(|err| {
                    Error::write_error(format!(
                        "cannot create {}: {err}",
                        path.display()
                    ))
                })?;
                Box::new(BufWriter::new(file))
            }
            OutputFile::Null => Box::new(io::sink()),
        })
    }
}

impl FromStr for OutputFile {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" | "<out>" => Ok(OutputFile::Stdout),
            "<err>" => Ok(OutputFile::Stderr),
            "<null>" => Ok(OutputFile::Null),
            _ => Ok(OutputFile::File(PathBuf::from(s))),
        }
    }
}

impl std::fmt::Display for OutputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFile::Stdout => f.write_str("-"),
            OutputFile::Stderr => f.write_str("<err>"),
            OutputFile::Null => f.write_str("<null>"),
            OutputFile::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OutputFile;
    use std::path::PathBuf;

    #[test]
    fn parse_streams() {
        assert_eq!("-".parse::<OutputFile>(), Ok(OutputFile::Stdout));
        assert_eq!("<err>".parse::<OutputFile>(), Ok(OutputFile::Stderr));
        assert_eq!("<null>".parse::<OutputFile>(), Ok(OutputFile::Null));
        assert_eq!(
            "out.json".parse::<OutputFile>(),
            Ok(OutputFile::File(PathBuf::from("out.json")))
        );
    }
}
