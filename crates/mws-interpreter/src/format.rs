//! printf-style formatting for `messagebox` and console reports.

use mws_core::ScriptError;

use crate::runtime::Runtime;

/// Formats `format`, popping one stack value per conversion. `%s` pops a
/// string literal index, `%d`/`%i` an integer and `%f`/`%g`/`%e` a float.
/// An optional width and `.precision` may precede the conversion.
pub fn format_message(format: &str, runtime: &mut Runtime<'_>) -> Result<String, ScriptError> {
    let mut output = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            output.push('%');
            continue;
        }

        let mut width = String::new();
        while let Some(digit) = chars.peek().copied().filter(char::is_ascii_digit) {
            width.push(digit);
            chars.next();
        }
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut digits = String::new();
            while let Some(digit) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(digit);
                chars.next();
            }
            precision = Some(digits.parse::<usize>().unwrap_or(0));
        }
        let width = width.parse::<usize>().unwrap_or(0);

        let text = match chars.next() {
            Some('s') => runtime.pop_string()?.to_string(),
            Some('d' | 'i') => runtime.pop_integer()?.to_string(),
            Some('f') => format!("{:.*}", precision.unwrap_or(6), runtime.pop_float()?),
            Some('e') => format!("{:.*e}", precision.unwrap_or(6), runtime.pop_float()?),
            Some('g') => {
                let value = runtime.pop_float()?;
                match precision {
                    Some(precision) => format!("{:.*}", precision, value),
                    None => value.to_string(),
                }
            }
            Some(other) => {
                output.push('%');
                output.push(other);
                continue;
            }
            None => {
                output.push('%');
                break;
            }
        };
        output.push_str(&format!("{:>width$}", text, width = width));
    }
    Ok(output)
}
