//! 专业代码对照表

use phf::phf_map;

static BRANCH_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "CS" => "Computer Science & Engineering",
    "EE" => "Electrical & Electronics Engineering",
    "ME" => "Mechanical Engineering",
    "CV" => "Civil Engineering",
    "AD" => "Artificial Intelligence & Data Science",
    "EC" => "Electronics & Communication Engineering",
};

/// 根据两位专业代码取专业全称（不区分大小写）
pub fn branch_name(code: &str) -> Option<&'static str> {
    BRANCH_NAMES.get(code.to_ascii_uppercase().as_str()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve() {
        assert_eq!(branch_name("cs"), Some("Computer Science & Engineering"));
        assert_eq!(branch_name("AD"), Some("Artificial Intelligence & Data Science"));
        assert_eq!(branch_name("ZZ"), None);
    }
}
