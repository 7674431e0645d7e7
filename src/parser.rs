//! Matrix Market and right-hand-side readers.
//!
//! # Supported syntax
//!
//! ```text
//! %%MatrixMarket matrix coordinate real|integer|pattern general|symmetric
//! % comment lines
//! rows cols entries
//! i j value          (1-based indices; value omitted for pattern)
//! ```
//!
//! Symmetric files store one triangle; the mirrored entries are added on
//! read. Right-hand sides are whitespace-separated numbers with `%` or `#`
//! comments, or a Matrix Market `array` file with a single column.

use nom::branch::alt;
use nom::bytes::complete::tag_no_case;
use nom::character::complete::{digit1, space0, space1};
use nom::combinator::{map, map_res, opt};
use nom::number::complete::double;
use nom::sequence::preceded;
use nom::IResult;
use nom::Parser;

use crate::error::{MultishiftError, Result};
use crate::sparse::CsrMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Real,
    Integer,
    Pattern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symmetry {
    General,
    Symmetric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Coordinate,
    Array,
}

/// The `%%MatrixMarket` banner line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub format: Format,
    pub field: Field,
    pub symmetry: Symmetry,
}

/// Parse a Matrix Market coordinate file into a CSR matrix.
pub fn parse_matrix_market(input: &str) -> Result<CsrMatrix<f64>> {
    let mut lines = data_lines(input, '%');

    let (line_num, raw_line) = lines
        .next()
        .ok_or_else(|| MultishiftError::Parse("empty matrix file".into()))?;
    let header = parse_header_line(raw_line).map_err(|e| parse_err(line_num, raw_line, &e))?;
    if header.format != Format::Coordinate {
        return Err(parse_err(
            line_num,
            raw_line,
            "only coordinate matrices are supported",
        ));
    }

    let (line_num, raw_line) = lines
        .next()
        .ok_or_else(|| MultishiftError::Parse("missing size line".into()))?;
    let (rest, (nrows, _, ncols, _, nnz, _)) = (index, space1, index, space1, index, space0)
        .parse(raw_line.trim())
        .map_err(|_| parse_err(line_num, raw_line, "expected 'rows cols entries'"))?;
    if !rest.is_empty() {
        return Err(parse_err(
            line_num,
            raw_line,
            &format!("unexpected trailing text '{rest}'"),
        ));
    }
    check_dims(nrows, ncols).map_err(|e| parse_err(line_num, raw_line, &e))?;
    if nrows.checked_mul(ncols).is_some_and(|cells| nnz > cells) {
        return Err(parse_err(
            line_num,
            raw_line,
            &format!("{nnz} entries do not fit a {nrows}x{ncols} matrix"),
        ));
    }
    if header.symmetry == Symmetry::Symmetric && nrows != ncols {
        return Err(parse_err(line_num, raw_line, "symmetric matrix must be square"));
    }

    // Grown from the entries actually present; the declared count is checked below.
    let mut triplets = Vec::new();
    let mut seen = 0usize;
    for (line_num, raw_line) in lines {
        let (row, col, value) = parse_entry_line(raw_line.trim(), header.field)
            .map_err(|e| parse_err(line_num, raw_line, &e))?;
        if row == 0 || col == 0 || row > nrows || col > ncols {
            return Err(parse_err(
                line_num,
                raw_line,
                &format!("entry ({row}, {col}) outside {nrows}x{ncols} matrix"),
            ));
        }
        let (row, col) = (row - 1, col - 1);
        triplets.push((row, col, value));
        if header.symmetry == Symmetry::Symmetric && row != col {
            triplets.push((col, row, value));
        }
        seen += 1;
    }

    if seen != nnz {
        return Err(MultishiftError::Parse(format!(
            "size line declares {nnz} entries, found {seen}"
        )));
    }

    Ok(CsrMatrix::from_triplets(nrows, ncols, &triplets))
}

/// Parse a right-hand-side vector.
///
/// Accepts either plain whitespace-separated numbers or a Matrix Market
/// `array` file with one column.
pub fn parse_vector(input: &str) -> Result<Vec<f64>> {
    let first = input.lines().map(str::trim).find(|l| !l.is_empty());
    if first.is_some_and(|l| l.starts_with("%%")) {
        return parse_array_vector(input);
    }

    let mut values = Vec::new();
    for (line_num, raw_line) in data_lines(input, '#') {
        let line = raw_line.split('%').next().unwrap_or_default();
        for token in line.split_whitespace() {
            values.push(number(token).map_err(|e| parse_err(line_num, raw_line, &e))?);
        }
    }
    Ok(values)
}

fn parse_array_vector(input: &str) -> Result<Vec<f64>> {
    let mut lines = data_lines(input, '%');
    let (line_num, raw_line) = lines
        .next()
        .ok_or_else(|| MultishiftError::Parse("empty vector file".into()))?;
    let header = parse_header_line(raw_line).map_err(|e| parse_err(line_num, raw_line, &e))?;
    if header.format != Format::Array || header.field == Field::Pattern {
        return Err(parse_err(line_num, raw_line, "expected a real or integer array"));
    }

    let (line_num, raw_line) = lines
        .next()
        .ok_or_else(|| MultishiftError::Parse("missing size line".into()))?;
    let (rest, (nrows, _, ncols, _)) = (index, space1, index, space0)
        .parse(raw_line.trim())
        .map_err(|_| parse_err(line_num, raw_line, "expected 'rows cols'"))?;
    if !rest.is_empty() {
        return Err(parse_err(
            line_num,
            raw_line,
            &format!("unexpected trailing text '{rest}'"),
        ));
    }
    if ncols != 1 {
        return Err(parse_err(line_num, raw_line, "vector must have exactly one column"));
    }

    let mut values = Vec::new();
    for (line_num, raw_line) in lines {
        values.push(number(raw_line.trim()).map_err(|e| parse_err(line_num, raw_line, &e))?);
    }
    if values.len() != nrows {
        return Err(MultishiftError::Parse(format!(
            "size line declares {nrows} values, found {}",
            values.len()
        )));
    }
    Ok(values)
}

/// Non-blank lines with their 0-based line number. Lines starting with
/// `comment` are skipped, except the `%%` banner.
fn data_lines(input: &str, comment: char) -> impl Iterator<Item = (usize, &str)> {
    input.lines().enumerate().filter(move |(_, raw)| {
        let line = raw.trim();
        !line.is_empty() && (line.starts_with("%%") || !line.starts_with(comment))
    })
}

/// Reject sizes whose CSR row-pointer array cannot be indexed.
fn check_dims(nrows: usize, ncols: usize) -> std::result::Result<(), String> {
    if nrows.checked_add(1).is_none() || ncols.checked_add(1).is_none() {
        return Err(format!("matrix size {nrows}x{ncols} is too large"));
    }
    Ok(())
}

fn parse_err(line_num: usize, raw_line: &str, detail: &str) -> MultishiftError {
    MultishiftError::Parse(format!("line {}: {} in: {}", line_num + 1, detail, raw_line))
}

// ---------------------------------------------------------------------------
// Token parsers
// ---------------------------------------------------------------------------

/// Unsigned decimal integer.
fn index(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>()).parse(input)
}

fn float(input: &str) -> IResult<&str, f64> {
    double(input)
}

/// A single number that must consume the whole token.
fn number(token: &str) -> std::result::Result<f64, String> {
    match float(token) {
        Ok(("", value)) => Ok(value),
        _ => Err(format!("invalid number '{token}'")),
    }
}

fn matrix_format(input: &str) -> IResult<&str, Format> {
    alt((
        map(tag_no_case("coordinate"), |_: &str| Format::Coordinate),
        map(tag_no_case("array"), |_: &str| Format::Array),
    ))
    .parse(input)
}

fn field(input: &str) -> IResult<&str, Field> {
    alt((
        map(tag_no_case("real"), |_: &str| Field::Real),
        map(tag_no_case("double"), |_: &str| Field::Real),
        map(tag_no_case("integer"), |_: &str| Field::Integer),
        map(tag_no_case("pattern"), |_: &str| Field::Pattern),
    ))
    .parse(input)
}

fn symmetry(input: &str) -> IResult<&str, Symmetry> {
    alt((
        map(tag_no_case("general"), |_: &str| Symmetry::General),
        map(tag_no_case("symmetric"), |_: &str| Symmetry::Symmetric),
    ))
    .parse(input)
}

// ---------------------------------------------------------------------------
// Line parsers
// ---------------------------------------------------------------------------

/// Parse: %%MatrixMarket matrix coordinate real general
fn parse_header_line(line: &str) -> std::result::Result<Header, String> {
    let (rest, (_, _, _, _, format, _, field, _, symmetry)) = (
        tag_no_case("%%MatrixMarket"),
        space1,
        tag_no_case("matrix"),
        space1,
        matrix_format,
        space1,
        field,
        space1,
        symmetry,
    )
        .parse(line.trim())
        .map_err(|_| "invalid %%MatrixMarket header".to_string())?;
    if !rest.trim().is_empty() {
        return Err(format!("unexpected trailing text '{}' in header", rest.trim()));
    }
    Ok(Header {
        format,
        field,
        symmetry,
    })
}

/// Parse: i j [value]
fn parse_entry_line(line: &str, field: Field) -> std::result::Result<(usize, usize, f64), String> {
    let (rest, (row, _, col, value, _)) = (
        index,
        space1,
        index,
        opt(preceded(space1, float)),
        space0,
    )
        .parse(line)
        .map_err(|_| "failed to parse matrix entry".to_string())?;
    if !rest.is_empty() {
        return Err(format!("unexpected trailing text '{rest}'"));
    }

    let value = match (field, value) {
        (Field::Pattern, None) => 1.0,
        (Field::Pattern, Some(_)) => return Err("pattern entry carries a value".into()),
        (_, Some(v)) => v,
        (_, None) => return Err("missing entry value".into()),
    };
    Ok((row, col, value))
}
