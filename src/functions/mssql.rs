use super::{CastType, DatePart, Functions, iif_nest};

/// SQL Server function syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlFunctions;

fn datepart_code(part: DatePart) -> &'static str {
    match part {
        DatePart::Year => "yyyy",
        DatePart::Month => "mm",
        DatePart::Day => "dd",
        DatePart::Hour => "hh",
        DatePart::Minute => "mi",
        DatePart::Second => "ss",
        DatePart::Microsecond => "mcs",
        DatePart::DayOfWeek => "dw",
        DatePart::DayOfYear => "dy",
        DatePart::WeekOfYear => "ww",
    }
}

/// 1 for Sunday through 7 for Saturday.
fn sunday_based_weekday(date: &str) -> String {
    format!("((datepart( dw, {date} ) + @@DATEFIRST - 1) % 7 + 1)")
}

impl Functions for MssqlFunctions {
    fn trim(&self, s: &str) -> String {
        format!("ltrim( rtrim( {s} ) )")
    }

    fn substr(&self, s: &str, start: i64, len: i64) -> String {
        format!("substring( {s}, {start}, {len} )")
    }

    fn concat(&self, args: &[&str]) -> String {
        args.join("+")
    }

    fn ceil(&self, v: &str) -> String {
        format!("ceiling( {v} )")
    }

    fn round(&self, v: &str, places: i32) -> String {
        format!("round( {v}, {places}, 0 )")
    }

    fn trunc(&self, v: &str, places: i32) -> String {
        format!("round( {v}, {places}, 1 )")
    }

    fn cast_type(&self, to: CastType, size: Option<u32>, precision: Option<u32>) -> String {
        let sized = |name: &str| match size {
            Some(n) => format!("{name}({n})"),
            None => name.to_string(),
        };
        match to {
            CastType::Binary => sized("BINARY"),
            CastType::Char => sized("VARCHAR"),
            CastType::Integer | CastType::Unsigned => "INT".to_string(),
            CastType::Decimal => match (size, precision) {
                (Some(s), Some(p)) => format!("DECIMAL({s}, {p})"),
                (Some(s), None) => format!("DECIMAL({s})"),
                _ => "DECIMAL".to_string(),
            },
            CastType::Datetime => "DATETIME".to_string(),
            CastType::Date => "DATE".to_string(),
            CastType::Time => "TIME".to_string(),
            CastType::Json => "NVARCHAR(MAX)".to_string(),
        }
    }

    fn iif(&self, cond: &str, then: &str, otherwise: &str) -> String {
        format!("iif( {cond}, {then}, {otherwise} )")
    }

    fn ifnull(&self, x: &str, fallback: &str) -> String {
        format!("isnull( {x}, {fallback} )")
    }

    fn isnull(&self, x: &str) -> String {
        format!("(iif( ({x}) IS NULL, 0, 1 ) = 0)")
    }

    fn greatest(&self, values: &[&str]) -> String {
        iif_nest(values, " > ")
    }

    fn least(&self, values: &[&str]) -> String {
        iif_nest(values, " < ")
    }

    fn null_safe_equal(&self, a: &str, b: &str) -> String {
        format!("({a} = {b} OR ({a} IS NULL AND {b} IS NULL))")
    }

    fn now(&self, _precision: u8) -> String {
        "getDate()".to_string()
    }

    fn date(&self) -> String {
        "convert( date, sysDateTime() )".to_string()
    }

    fn time(&self, _precision: u8) -> String {
        "convert( time, sysDateTime() )".to_string()
    }

    fn date_add(&self, date: &str, part: DatePart, amount: &str) -> String {
        format!("dateadd( {}, {}, {date} )", datepart_code(part), amount.trim())
    }

    /// Day and week numbers count from Sunday whatever `@@DATEFIRST` says.
    fn date_extract(&self, field: &str, part: DatePart) -> String {
        match part {
            DatePart::DayOfWeek => sunday_based_weekday(field),
            DatePart::WeekOfYear => format!(
                "((datepart( dy, {field} ) + {} - 2) / 7 + 1)",
                sunday_based_weekday(&format!("datefromparts( year( {field} ), 1, 1 )"))
            ),
            _ => format!("datepart( {}, {field} )", datepart_code(part)),
        }
    }

    fn value(&self, column: &str) -> String {
        format!("s.{column}")
    }
}
