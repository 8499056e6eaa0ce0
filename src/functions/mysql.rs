use super::{CastType, DatePart, Functions, negative_literal};

/// MySQL / MariaDB function syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlFunctions;

fn interval_unit(part: DatePart) -> &'static str {
    match part {
        DatePart::Year => "YEAR",
        DatePart::Month => "MONTH",
        DatePart::Day | DatePart::DayOfWeek | DatePart::DayOfYear => "DAY",
        DatePart::Hour => "HOUR",
        DatePart::Minute => "MINUTE",
        DatePart::Second => "SECOND",
        DatePart::Microsecond => "MICROSECOND",
        DatePart::WeekOfYear => "WEEK",
    }
}

impl Functions for MysqlFunctions {
    fn trim(&self, s: &str) -> String {
        format!("trim( {s} )")
    }

    fn substr(&self, s: &str, start: i64, len: i64) -> String {
        format!("substr( {s}, {start}, {len} )")
    }

    fn concat(&self, args: &[&str]) -> String {
        format!("concat( {} )", args.join(","))
    }

    fn ceil(&self, v: &str) -> String {
        format!("ceil( {v} )")
    }

    fn round(&self, v: &str, places: i32) -> String {
        format!("round( {v}, {places} )")
    }

    fn trunc(&self, v: &str, places: i32) -> String {
        format!("truncate( {v}, {places} )")
    }

    fn cast_type(&self, to: CastType, size: Option<u32>, precision: Option<u32>) -> String {
        let sized = |name: &str| match size {
            Some(n) => format!("{name}({n})"),
            None => name.to_string(),
        };
        match to {
            CastType::Binary => sized("BINARY"),
            CastType::Char => sized("CHAR"),
            CastType::Integer => "SIGNED INTEGER".to_string(),
            CastType::Unsigned => "UNSIGNED INTEGER".to_string(),
            CastType::Decimal => match (size, precision) {
                (Some(s), Some(p)) => format!("DECIMAL({s}, {p})"),
                (Some(s), None) => format!("DECIMAL({s})"),
                _ => "DECIMAL".to_string(),
            },
            CastType::Datetime => "DATETIME".to_string(),
            CastType::Date => "DATE".to_string(),
            CastType::Time => "TIME".to_string(),
            CastType::Json => "JSON".to_string(),
        }
    }

    fn iif(&self, cond: &str, then: &str, otherwise: &str) -> String {
        format!("if( {cond}, {then}, {otherwise} )")
    }

    fn ifnull(&self, x: &str, fallback: &str) -> String {
        format!("ifnull( {x}, {fallback} )")
    }

    fn isnull(&self, x: &str) -> String {
        format!("isnull( {x} )")
    }

    fn greatest(&self, values: &[&str]) -> String {
        format!("greatest( {} )", values.join(", "))
    }

    fn least(&self, values: &[&str]) -> String {
        format!("least( {} )", values.join(", "))
    }

    fn null_safe_equal(&self, a: &str, b: &str) -> String {
        format!("({a} <=> {b})")
    }

    fn now(&self, precision: u8) -> String {
        format!("now( {precision} )")
    }

    fn date(&self) -> String {
        "curdate()".to_string()
    }

    fn time(&self, precision: u8) -> String {
        format!("curtime( {precision} )")
    }

    fn date_add(&self, date: &str, part: DatePart, amount: &str) -> String {
        let unit = interval_unit(part);
        match negative_literal(amount) {
            Some(magnitude) => format!("date_sub( {date}, INTERVAL {magnitude} {unit} )"),
            None => format!("date_add( {date}, INTERVAL {} {unit} )", amount.trim()),
        }
    }

    fn date_extract(&self, field: &str, part: DatePart) -> String {
        match part {
            DatePart::Year => format!("year( {field} )"),
            DatePart::Month => format!("month( {field} )"),
            DatePart::Day => format!("day( {field} )"),
            DatePart::Hour => format!("hour( {field} )"),
            DatePart::Minute => format!("minute( {field} )"),
            DatePart::Second => format!("second( {field} )"),
            DatePart::Microsecond => format!("microsecond( {field} )"),
            DatePart::DayOfWeek => format!("dayofweek( {field} )"),
            DatePart::DayOfYear => format!("dayofyear( {field} )"),
            // Weeks start on Sunday and week 1 is the one holding January 1st.
            DatePart::WeekOfYear => format!(
                "(floor( (dayofyear( {field} ) + dayofweek( makedate( year( {field} ), 1 ) ) - 2) / 7 ) + 1)"
            ),
        }
    }

    fn value(&self, column: &str) -> String {
        format!("Values( {column} )")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F: MysqlFunctions = MysqlFunctions;

    #[test]
    fn aggregates_and_strings() {
        assert_eq!(F.count("id", true), "count( DISTINCT id )");
        assert_eq!(F.count("*", false), "count( * )");
        assert_eq!(F.trim("name"), "trim( name )");
        assert_eq!(F.substr("name", 2, 3), "substr( name, 2, 3 )");
        assert_eq!(F.concat(&["a", "'-'", "b"]), "concat( a,'-',b )");
        assert_eq!(F.replace("s", "'a'", "'b'"), "replace( s, 'a', 'b' )");
    }

    #[test]
    fn numeric() {
        assert_eq!(F.ceil("x"), "ceil( x )");
        assert_eq!(F.round("x", 2), "round( x, 2 )");
        assert_eq!(F.trunc("x", 1), "truncate( x, 1 )");
        assert_eq!(
            F.cast("x", CastType::Decimal, Some(10), Some(2)),
            "cast( x AS DECIMAL(10, 2) )"
        );
        assert_eq!(F.cast("x", CastType::Integer, None, None), "cast( x AS SIGNED INTEGER )");
        assert_eq!(F.cast("x", CastType::Char, Some(5), None), "cast( x AS CHAR(5) )");
    }

    #[test]
    fn conditionals() {
        assert_eq!(F.iif("a > 1", "'y'", "'n'"), "if( a > 1, 'y', 'n' )");
        assert_eq!(F.ifnull("a", "0"), "ifnull( a, 0 )");
        assert_eq!(F.isnull("a"), "isnull( a )");
        assert_eq!(F.coalesce(&["a", "b", "0"]), "coalesce( a, b, 0 )");
        assert_eq!(F.greatest(&["a", "b"]), "greatest( a, b )");
        assert_eq!(F.least(&["a", "b", "c"]), "least( a, b, c )");
        assert_eq!(F.null_safe_equal("a", "b"), "(a <=> b)");
    }

    #[test]
    fn dates() {
        assert_eq!(F.now(3), "now( 3 )");
        assert_eq!(F.date(), "curdate()");
        assert_eq!(F.time(0), "curtime( 0 )");
        assert_eq!(
            F.date_add("d", DatePart::Day, "5"),
            "date_add( d, INTERVAL 5 DAY )"
        );
        assert_eq!(
            F.date_add("d", DatePart::Month, "-2"),
            "date_sub( d, INTERVAL 2 MONTH )"
        );
        assert_eq!(
            F.date_add("d", DatePart::Hour, "n"),
            "date_add( d, INTERVAL n HOUR )"
        );
        assert_eq!(
            F.date_extract("d", DatePart::WeekOfYear),
            "(floor( (dayofyear( d ) + dayofweek( makedate( year( d ), 1 ) ) - 2) / 7 ) + 1)"
        );
        assert_eq!(F.date_extract("d", DatePart::DayOfYear), "dayofyear( d )");
    }

    #[test]
    fn upsert_value_reference() {
        assert_eq!(F.value("name"), "Values( name )");
    }
}
