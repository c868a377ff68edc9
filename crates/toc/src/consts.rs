use regex::Regex;
use std::sync::LazyLock;

const NUMERAL: &str = "一二三四五六七八九十百千万零\\d";

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// Every pattern is anchored: a heading must start the (indent-trimmed) line.
regex!(NUMBERED_REGEX, format!("^第[{NUMERAL}]+[部集卷章回节册篇目]").as_str());
regex!(BARE_VOLUME_REGEX, format!("^(?:卷|册|篇)[{NUMERAL}\\s、\\-.：:]+章?").as_str());
regex!(UPPER_LOWER_REGEX, "^[上下][册卷篇]");
regex!(LATIN_REGEX, r"(?i)^chapter\s+\d+");
regex!(EXTRA_REGEX, format!("^番外[{NUMERAL}\\s]*篇?").as_str());
regex!(STANDALONE_REGEX, "^(?:外传|后记|尾声|终章|楔子|序章|引子)");

/// Marks that may end a descriptive title on the heading line.
pub(crate) const TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];
