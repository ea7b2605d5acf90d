//! Column type names: syntax check and canonical spelling.
//!
//! The canonical spelling is what PostgreSQL's `format_type` reports, so a
//! declared `timestamptz` compares equal to a catalog `timestamp with time zone`.

use std::sync::LazyLock;

use regex::Regex;

static TYPE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i)[a-z_][a-z0-9_$]*(\.[a-z_][a-z0-9_$]*)?(\s+(varying|precision))?(\s*\(\s*\d+\s*(,\s*\d+\s*)?\))?(\s+with(out)?\s+time\s+zone)?(\s*\[\s*\d*\s*\])*$",
    )
    .unwrap()
});

/// Whether `name` is a syntactically plausible type: an optionally
/// schema-qualified name, `varying` / `precision`, an optional `(p[, s])`
/// modifier, `with[out] time zone`, optional `[]` suffixes. Anything else after
/// the name (constraints, collations) is rejected.
pub fn is_valid_type_name(name: &str) -> bool {
    TYPE_NAME_REGEX.is_match(name.trim())
}

/// Serial pseudo-types own an implicit sequence.
pub fn is_serial(name: &str) -> bool {
    matches!(
        name.trim().to_ascii_lowercase().as_str(),
        "serial" | "serial4" | "bigserial" | "serial8" | "smallserial" | "serial2"
    )
}

fn canonical_alias(name: &str) -> &str {
    match name {
        "int" | "int4" | "serial" | "serial4" => "integer",
        "int8" | "bigserial" | "serial8" => "bigint",
        "int2" | "smallserial" | "serial2" => "smallint",
        "bool" => "boolean",
        "float" | "float8" => "double precision",
        "float4" => "real",
        "decimal" => "numeric",
        "varchar" => "character varying",
        "char" | "bpchar" => "character",
        "timestamp" => "timestamp without time zone",
        "timestamptz" => "timestamp with time zone",
        "time" => "time without time zone",
        "timetz" => "time with time zone",
        "varbit" => "bit varying",
        other => other,
    }
}

const SEARCH_PATH_SCHEMAS: &[&str] = &["pg_catalog.", "public."];

/// `float(p)` is `real` up to 24 bits of precision, `double precision` above.
fn float_by_precision(precision: &str) -> &'static str {
    match precision.parse::<u32>() {
        Ok(bits) if bits <= 24 => "real",
        _ => "double precision",
    }
}

/// Lowercase, collapse whitespace, resolve aliases, keep modifier and array dims.
pub fn canonical_type(name: &str) -> String {
    let collapsed = name.trim().to_ascii_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    // format_type leaves types on the default search path unqualified.
    let collapsed = SEARCH_PATH_SCHEMAS
        .iter()
        .find_map(|schema| collapsed.strip_prefix(schema))
        .map_or_else(|| collapsed.clone(), str::to_owned);

    let (base, dims) = match collapsed.find('[') {
        Some(pos) => (collapsed[..pos].trim_end(), collapsed[pos..].matches('[').count()),
        None => (collapsed.as_str(), 0),
    };

    let (head, modifier, tail) = match (base.find('('), base.find(')')) {
        (Some(open), Some(close)) if open < close => {
            let inner: String = base[open + 1..close].chars().filter(|c| !c.is_whitespace()).collect();
            (base[..open].trim_end(), Some(inner), base[close + 1..].trim_start())
        },
        _ => (base, None, ""),
    };

    let key = if tail.is_empty() { head.to_owned() } else { format!("{head} {tail}") };
    let (canonical, modifier) = match (canonical_alias(&key), modifier) {
        ("double precision", Some(p)) if key == "float" => (float_by_precision(&p), None),
        (fixed @ ("character" | "bit"), None) => (fixed, Some("1".to_owned())),
        (canonical, modifier) => (canonical, modifier),
    };

    let mut out = match modifier {
        // format_type places the precision right after the leading keyword.
        Some(modifier) if canonical.starts_with("timestamp ") || canonical.starts_with("time ") => {
            let (first, rest) = canonical.split_once(' ').unwrap_or((canonical, ""));
            format!("{first}({modifier}) {rest}")
        },
        Some(modifier) => format!("{canonical}({modifier})"),
        None => canonical.to_owned(),
    };
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}

/// Canonical name stripped of modifier and array dims, for type-existence checks.
pub fn base_type(name: &str) -> String {
    let canonical = canonical_type(name);
    let without_dims = canonical.split('[').next().unwrap_or_default();
    match (without_dims.find('('), without_dims.find(')')) {
        (Some(open), Some(close)) if open < close => {
            let tail = without_dims[close + 1..].trim_start();
            let head = without_dims[..open].trim_end();
            if tail.is_empty() { head.to_owned() } else { format!("{head} {tail}") }
        },
        _ => without_dims.to_owned(),
    }
}
