//! Adobe/Resolve `.cube` text format.
//!
//! # Format
//!
//! ```text
//! # Comment
//! TITLE "LUT Name"
//! LUT_3D_SIZE 33
//! DOMAIN_MIN 0.0 0.0 0.0
//! DOMAIN_MAX 1.0 1.0 1.0
//! 0.0 0.0 0.0
//! ...
//! 1.0 1.0 1.0
//! ```
//!
//! Data lines are in R-fastest order, matching the in-memory lattice, so no
//! reordering happens on either side. Only the unit domain is accepted.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::Lut3D;
use crate::error::{Error, Result};

impl Lut3D {
    /// Reads a 3D LUT from a `.cube` file.
    pub fn read_cube(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let lut = Self::parse_cube(BufReader::new(file))?;
        tracing::info!("Loaded {}^3 LUT from {}", lut.size, path.display());
        Ok(lut)
    }

    /// Parses a 3D LUT from `.cube` text. Any malformed line fails the whole
    /// parse.
    pub fn parse_cube<R: BufRead>(reader: R) -> Result<Self> {
        let mut size: Option<usize> = None;
        let mut data: Vec<[f32; 3]> = Vec::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            let lineno = lineno + 1;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(keyword) = tokens.next() else {
                continue;
            };
            match keyword {
                "TITLE" => {}
                "LUT_3D_SIZE" => {
                    if size.is_some() {
                        return Err(parse_error(lineno, "duplicate LUT_3D_SIZE"));
                    }
                    size = Some(parse_size(lineno, tokens)?);
                }
                "LUT_1D_SIZE" => {
                    return Err(parse_error(lineno, "expected 3D LUT, found 1D"));
                }
                "DOMAIN_MIN" => expect_domain(lineno, tokens, 0.0)?,
                "DOMAIN_MAX" => expect_domain(lineno, tokens, 1.0)?,
                _ => data.push(parse_rgb(lineno, line)?),
            }
        }

        let size = size.ok_or_else(|| Error::format("missing LUT_3D_SIZE"))?;
        let expected = size * size * size;
        if data.len() != expected {
            return Err(Error::format(format!(
                "expected {expected} values for size {size}, found {}",
                data.len()
            )));
        }
        Self::from_data(size, data)
    }

    /// Writes the LUT as `.cube` text.
    ///
    /// Values use the shortest representation that parses back to the same
    /// `f32`, so write followed by [`parse_cube`](Self::parse_cube) is lossless.
    pub fn write_cube<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "# Created by huestack")?;
        writeln!(writer, "LUT_3D_SIZE {}", self.size)?;
        writeln!(writer)?;
        for rgb in &self.data {
            writeln!(writer, "{} {} {}", rgb[0], rgb[1], rgb[2])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the LUT to a `.cube` file.
    pub fn write_cube_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.write_cube(BufWriter::new(file))?;
        tracing::info!("Saved {}^3 LUT to {}", self.size, path.display());
        Ok(())
    }
}

fn parse_error(lineno: usize, msg: &str) -> Error {
    Error::format(format!("line {lineno}: {msg}"))
}

fn parse_size<'a>(lineno: usize, mut tokens: impl Iterator<Item = &'a str>) -> Result<usize> {
    let value = tokens
        .next()
        .ok_or_else(|| parse_error(lineno, "missing size value"))?;
    if tokens.next().is_some() {
        return Err(parse_error(lineno, "trailing tokens after size"));
    }
    let size: usize = value
        .parse()
        .map_err(|_| parse_error(lineno, &format!("invalid size value {value:?}")))?;
    if !(super::MIN_SIZE..=super::MAX_SIZE).contains(&size) {
        return Err(parse_error(lineno, &format!("unsupported size {size}")));
    }
    Ok(size)
}

fn expect_domain<'a>(
    lineno: usize,
    tokens: impl Iterator<Item = &'a str>,
    expected: f32,
) -> Result<()> {
    let values = parse_floats(lineno, tokens)?;
    if values.iter().any(|&v| v != expected) {
        return Err(parse_error(
            lineno,
            &format!("only the unit domain is supported, got {values:?}"),
        ));
    }
    Ok(())
}

fn parse_rgb(lineno: usize, line: &str) -> Result<[f32; 3]> {
    parse_floats(lineno, line.split_whitespace())
}

fn parse_floats<'a>(lineno: usize, tokens: impl Iterator<Item = &'a str>) -> Result<[f32; 3]> {
    let mut out = [0.0f32; 3];
    let mut count = 0;
    for token in tokens {
        if count == 3 {
            return Err(parse_error(lineno, "expected exactly three values"));
        }
        let v: f32 = token
            .parse()
            .map_err(|_| parse_error(lineno, &format!("invalid number {token:?}")))?;
        if !v.is_finite() {
            return Err(parse_error(lineno, &format!("non-finite value {token:?}")));
        }
        out[count] = v;
        count += 1;
    }
    if count != 3 {
        return Err(parse_error(lineno, "expected exactly three values"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_cube() {
        let cube = r#"
# Test LUT
TITLE "Test Grade"
LUT_3D_SIZE 2
DOMAIN_MIN 0.0 0.0 0.0
DOMAIN_MAX 1.0 1.0 1.0

0.0 0.0 0.0
1.0 0.0 0.0
0.0 1.0 0.0
1.0 1.0 0.0
0.0 0.0 1.0
1.0 0.0 1.0
0.0 1.0 1.0
1.0 1.0 1.0
"#;
        let lut = Lut3D::parse_cube(Cursor::new(cube)).expect("valid cube");
        assert_eq!(lut.size(), 2);
        assert_eq!(lut.get(1, 0, 0), [1.0, 0.0, 0.0]);
        assert_eq!(lut.get(0, 1, 0), [0.0, 1.0, 0.0]);
        assert_eq!(lut.get(0, 0, 1), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_write_then_parse_is_lossless() {
        let mut lut = Lut3D::identity(5).expect("valid size");
        lut.set(2, 3, 1, [0.1234567, 0.3333333, 0.9]).expect("in bounds");
        let mut text = Vec::new();
        lut.write_cube(&mut text).expect("write to memory");
        let back = Lut3D::parse_cube(Cursor::new(text)).expect("parses");
        assert_eq!(back, lut);
    }

    #[test]
    fn test_rejects_malformed_input() {
        let header = "LUT_3D_SIZE 2\n";
        let eight = "0 0 0\n".repeat(8);
        let cases = [
            eight.clone(),
            format!("{header}{}", "0 0 0\n".repeat(7)),
            format!("{header}{}", "0 0 0\n".repeat(9)),
            format!("{header}{}0 0 abc\n", "0 0 0\n".repeat(7)),
            format!("{header}{}0 0\n", "0 0 0\n".repeat(7)),
            format!("{header}{}0 0 0 0\n", "0 0 0\n".repeat(7)),
            format!("LUT_1D_SIZE 2\n{eight}"),
            format!("LUT_3D_SIZE two\n{eight}"),
            "LUT_3D_SIZE 1\n0 0 0\n".to_string(),
            format!("{header}DOMAIN_MAX 2 2 2\n{eight}"),
            format!("{header}{header}{eight}"),
            format!("{header}{}0 0 2\n", "0 0 0\n".repeat(7)),
        ];
        for case in cases {
            assert!(
                matches!(Lut3D::parse_cube(Cursor::new(&case)), Err(Error::Format(_))),
                "accepted malformed cube:\n{case}"
            );
        }
    }
}
