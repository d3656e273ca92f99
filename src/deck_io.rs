//! Helpers for callers that convert decks from files or other readers.
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::Converter;
use crate::kunit_error::KResult;

/// Read a whole deck from `f` and convert it.
///
/// Bytes that are not valid UTF-8 (Latin-1 titles and comments, usually) are
/// replaced with U+FFFD rather than rejected.
pub fn convert_reader<R: Read>(mut f: BufReader<R>, converter: &Converter<'_>) -> KResult<String> {
    let text = read_deck(&mut f)?;
    converter.convert_text(&text)
}

/// Read a deck into a string, replacing invalid UTF-8.
pub fn read_deck<R: Read>(f: &mut BufReader<R>) -> KResult<String> {
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let text = match String::from_utf8(buf) {
        Ok(s) => s,
        Err(e) => {
            debug!("deck is not valid UTF-8, replacing invalid bytes");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    Ok(text)
}

/// Where to write a converted deck when no output path is given: `<input>.<dst>.k`
pub fn default_output_path<P: AsRef<Path>>(input: P, dst: &str) -> PathBuf {
    let input = input.as_ref();
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(format!(".{dst}.k"));
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use stringreader::StringReader;

    use super::*;
    use crate::kunit_error::KError;

    #[test]
    fn test_convert_reader() -> KResult<()> {
        let deck = StringReader::new("*MAT_NULL\n         1      1.84\n*END\n");
        let conv = Converter::new("mm-mg-us", "m-kg-s")?;
        let out = convert_reader(BufReader::new(deck), &conv)?;
        assert_eq!(out, "*MAT_NULL\n         1    1840.0\n*END\n");
        Ok(())
    }

    #[test]
    fn test_reader_error_is_located() -> KResult<()> {
        let deck = StringReader::new("*TITLE\nblast\n*EOS_JWL\n         1     1.0.0\n");
        let conv = Converter::new("mm-mg-us", "m-kg-s")?;
        let e = convert_reader(BufReader::new(deck), &conv).unwrap_err();
        assert!(matches!(&e, KError::MalformedField { .. }));
        assert_eq!(e.location().map(|l| l.line), Some(4));
        Ok(())
    }

    #[test]
    fn test_invalid_utf8_is_replaced() -> KResult<()> {
        let bytes: &[u8] = b"$ caf\xe9\n*MAT_NULL\n         1      1.84\n";
        let conv = Converter::new("mm-mg-us", "m-kg-s")?;
        let out = convert_reader(BufReader::new(bytes), &conv)?;
        assert_eq!(out, "$ caf\u{FFFD}\n*MAT_NULL\n         1    1840.0\n");
        Ok(())
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(default_output_path("decks/charge.k", "m-kg-s"), PathBuf::from("decks/charge.m-kg-s.k"));
        assert_eq!(default_output_path("charge", "mm-mg-us"), PathBuf::from("charge.mm-mg-us.k"));
    }
}
