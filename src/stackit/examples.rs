//! Help-text examples.

pub struct Example {
    pub description: &'static str,
    pub commands: Vec<&'static str>,
}

impl Example {
    pub fn new(description: &'static str, commands: &[&'static str]) -> Self {
        Self {
            description,
            commands: commands.to_vec(),
        }
    }

    fn render(&self) -> String {
        let mut out = format!("  {}", self.description);
        for command in &self.commands {
            out.push_str("\n    ");
            out.push_str(command);
        }
        out
    }
}

/// Joins examples with a blank line between them.
pub fn build(examples: &[Example]) -> String {
    examples
        .iter()
        .map(Example::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_examples_are_separated_by_blank_lines() {
        let text = build(&[
            Example::new("List instances", &["$ stackit observability instance list"]),
            Example::new(
                "Generate and use a payload",
                &[
                    "$ stackit observability scrape-config generate-payload > ./payload.json",
                    "$ stackit observability scrape-config create --payload @./payload.json",
                ],
            ),
        ]);
        assert_eq!(
            text,
            "  List instances\n    $ stackit observability instance list\n\n  Generate and use a payload\n    $ stackit observability scrape-config generate-payload > ./payload.json\n    $ stackit observability scrape-config create --payload @./payload.json"
        );
    }

    #[test]
    fn test_no_examples_is_empty() {
        assert_eq!(build(&[]), "");
    }
}
