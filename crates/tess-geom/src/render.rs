// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Text form of vertices and triangles.
//!
//! A vertex prints as `(+x.xx, +y.yy, +z.zz)`: explicit sign, two fixed
//! decimals, integer digits grouped by `,`. A triangle prints its three
//! vertices in order joined by ` -> `.

use std::fmt::{self, Write as _};

use crate::{Triangle, Vertex};

/// Signed, fixed two-decimal, digit-grouped coordinate.
///
/// Rounds half-up on the shortest decimal form of the value, so `0.125`
/// prints as `+0.13` and `1.005` as `+1.01`.
struct Coord(f64);

/// `magnitude` rounded half-up to two decimals, as integer and fraction digits.
fn round_half_up(magnitude: f64) -> (String, String) {
    let shortest = magnitude.to_string();
    let (int, frac) = shortest.split_once('.').unwrap_or((shortest.as_str(), ""));
    let mut digits: Vec<u8> = int
        .bytes()
        .chain(frac.bytes().chain(std::iter::repeat(b'0')).take(2))
        .collect();
    if frac.as_bytes().get(2).is_some_and(|d| *d >= b'5') {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }
    let split = digits.len() - 2;
    (
        String::from_utf8_lossy(&digits[..split]).into_owned(),
        String::from_utf8_lossy(&digits[split..]).into_owned(),
    )
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.0;
        if value.is_nan() {
            return f.write_str("NaN");
        }
        f.write_char(if value.is_sign_negative() { '-' } else { '+' })?;
        if value.is_infinite() {
            return f.write_str("Infinity");
        }
        let (int, frac) = round_half_up(value.abs());
        let len = int.len();
        for (i, digit) in int.chars().enumerate() {
            if i > 0 && (len - i) % 3 == 0 {
                f.write_char(',')?;
            }
            f.write_char(digit)?;
        }
        write!(f, ".{frac}")
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", Coord(self.x), Coord(self.y), Coord(self.z))
    }
}

impl fmt::Display for Triangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.vertices();
        write!(f, "{a} -> {b} -> {c}")
    }
}

/// Format a triangle for display. Same input, same bytes.
pub fn format_triangle(triangle: &Triangle) -> String {
    triangle.to_string()
}
