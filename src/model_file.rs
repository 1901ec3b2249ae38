//! Parser for the hardware model file describing the channel table.
//!
//! The table ships as a JavaScript-style array literal (`var fpgaAddressModel
//! = [...]`). There is no formal specification of the format, so the grammar
//! here follows the shipped files: fixed key order per object, double-quoted
//! strings without escapes, decimal and `0x` hex integers, `//` line
//! comments, the optional `isMsbFirst`/`unit`/`scale` keys, and an optional
//! trailing comma after the last element of a list.

use crate::schema::{
    RawChannel,
    RawRegister,
};
use nom::{
    branch::alt,
    bytes::complete::{
        tag,
        take_till,
        take_while1,
    },
    character::complete::{
        char,
        digit1,
        hex_digit1,
        multispace1,
        not_line_ending,
    },
    combinator::{
        map_res,
        opt,
        recognize,
        value,
    },
    multi::{
        many0,
        separated_list0,
    },
    number::complete::double,
    sequence::{
        delimited,
        pair,
        preceded,
        terminated,
        tuple,
    },
    IResult,
};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Parsing failed to match the model grammar")]
    ParseMatch,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("//"), not_line_ending))(input)
}

/// Whitespace and comments between tokens
fn sc(input: &str) -> IResult<&str, &str> {
    recognize(many0(alt((multispace1, line_comment))))(input)
}

fn lex<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    preceded(sc, inner)
}

/// A `key:` prefix followed by its value
fn field<'a, O, F>(key: &'static str, val: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    preceded(tuple((lex(tag(key)), lex(char(':')))), val)
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    delimited(char('"'), take_till(|c| c == '"'), char('"'))(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    alt((
        map_res(preceded(tag("0x"), hex_digit1), |h: &str| {
            i64::from_str_radix(h, 16)
        }),
        map_res(recognize(pair(opt(char('-')), digit1)), str::parse),
    ))(input)
}

fn boolean(input: &str) -> IResult<&str, bool> {
    alt((value(true, tag("true")), value(false, tag("false"))))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

fn register(input: &str) -> IResult<&str, RawRegister> {
    let (remaining, _) = lex(char('{'))(input)?;
    let (remaining, name) = field("name", lex(string_literal))(remaining)?;
    let (remaining, _) = lex(char(','))(remaining)?;
    let (remaining, desc) = field("desc", lex(string_literal))(remaining)?;
    let (remaining, _) = lex(char(','))(remaining)?;
    let (remaining, start_address) = field("start_address", lex(integer))(remaining)?;
    let (remaining, _) = lex(char(','))(remaining)?;
    let (remaining, data_size) = field("data_size", lex(string_literal))(remaining)?;
    let (remaining, _) = lex(char(','))(remaining)?;
    let (remaining, direction) = field("direction", lex(string_literal))(remaining)?;
    let (remaining, unit) =
        opt(preceded(lex(char(',')), field("unit", lex(string_literal))))(remaining)?;
    let (remaining, scale) =
        opt(preceded(lex(char(',')), field("scale", lex(double))))(remaining)?;
    let (remaining, _) = opt(lex(char(',')))(remaining)?;
    let (remaining, _) = lex(char('}'))(remaining)?;
    Ok((
        remaining,
        RawRegister {
            name: name.to_owned(),
            desc: desc.to_owned(),
            start_address,
            data_size: data_size.to_owned(),
            direction: direction.to_owned(),
            unit: unit.map(ToOwned::to_owned),
            scale,
        },
    ))
}

fn channel(input: &str) -> IResult<&str, RawChannel> {
    let (remaining, _) = lex(char('{'))(input)?;
    let (remaining, label) = field("label", lex(string_literal))(remaining)?;
    let (remaining, _) = lex(char(','))(remaining)?;
    let (remaining, mux_idx) = field("mux_idx", lex(integer))(remaining)?;
    let (remaining, _) = lex(char(','))(remaining)?;
    let (remaining, mux_channel) = field("channel", lex(integer))(remaining)?;
    let (remaining, _) = lex(char(','))(remaining)?;
    let (remaining, i2c_addr) = field("i2c_addr", lex(integer))(remaining)?;
    let (remaining, is_msb_first) =
        opt(preceded(lex(char(',')), field("isMsbFirst", lex(boolean))))(remaining)?;
    let (remaining, _) = lex(char(','))(remaining)?;
    let (remaining, functions) = field(
        "functions",
        delimited(
            lex(char('[')),
            terminated(
                separated_list0(lex(char(',')), register),
                opt(lex(char(','))),
            ),
            lex(char(']')),
        ),
    )(remaining)?;
    let (remaining, _) = opt(lex(char(',')))(remaining)?;
    let (remaining, _) = lex(char('}'))(remaining)?;
    Ok((
        remaining,
        RawChannel {
            label: label.to_owned(),
            mux_idx,
            channel: mux_channel,
            i2c_addr,
            is_msb_first,
            functions,
        },
    ))
}

pub(crate) fn model(input: &str) -> IResult<&str, Vec<RawChannel>> {
    let (remaining, _) = lex(tag("var"))(input)?;
    let (remaining, _) = preceded(multispace1, identifier)(remaining)?;
    let (remaining, _) = lex(char('='))(remaining)?;
    let (remaining, channels) = delimited(
        lex(char('[')),
        terminated(
            separated_list0(lex(char(',')), channel),
            opt(lex(char(','))),
        ),
        lex(char(']')),
    )(remaining)?;
    let (remaining, _) = opt(lex(char(';')))(remaining)?;
    let (remaining, _) = sc(remaining)?;
    Ok((remaining, channels))
}

/// Parses a model file's contents into raw channel records.
///
/// The result is unvalidated; pass it through [`crate::schema::load`].
///
/// # Errors
/// Returns an error when the input does not match the model grammar.
pub fn parse_model(input: &str) -> Result<Vec<RawChannel>, Error> {
    let (remaining, channels) = model(input).map_err(|_| Error::ParseMatch)?;
    if remaining.is_empty() {
        Ok(channels)
    } else {
        Err(Error::ParseMatch)
    }
}

/// Reads and parses a model file from disk.
///
/// # Errors
/// Returns an error on IO failure or when the file does not match the model
/// grammar.
pub fn read_model_file<T>(filename: T) -> Result<Vec<RawChannel>, Error>
where
    T: AsRef<Path>,
{
    let contents = std::fs::read_to_string(filename)?;
    parse_model(&contents)
}
