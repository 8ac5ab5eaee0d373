//! Evaluation of the URL templates a Zoekt server attaches to search results.
//!
//! Two conventions are in use: the `{{ URLJoinPath ... }}` directive, whose
//! placeholder arguments are percent-encoded per path segment, and plain
//! `{{.Version}}`/`{{.Path}}` substitution.

use std::sync::OnceLock;

use regex::Regex;

const VERSION_PLACEHOLDER: &str = "{{.Version}}";
const PATH_PLACEHOLDER: &str = "{{.Path}}";
const LINE_NUMBER_PLACEHOLDER: &str = "{{.LineNumber}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArg {
    Version,
    Path,
    Literal(String),
}

impl TemplateArg {
    fn parse(token: &str) -> Self {
        match token {
            ".Version" => TemplateArg::Version,
            ".Path" => TemplateArg::Path,
            other => TemplateArg::Literal(strip_quotes(other).to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlTemplate<'a> {
    JoinPath { args: Vec<TemplateArg> },
    Substitution { raw: &'a str },
}

fn join_path_regex() -> &'static Regex {
    static JOIN_PATH: OnceLock<Regex> = OnceLock::new();
    JOIN_PATH
        .get_or_init(|| Regex::new(r"^\{\{\s*URLJoinPath\s+(.+?)\s*\}\}$").expect("valid regex"))
}

/// Arguments of a `URLJoinPath` directive, or `None` for any other template.
fn join_path_args(template: &str) -> Option<impl Iterator<Item = &str>> {
    let caps = join_path_regex().captures(template)?;
    Some(caps.get(1)?.as_str().split_whitespace())
}

fn strip_quotes(token: &str) -> &str {
    token
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(token)
}

/// Percent-encode each `/`-separated segment on its own, keeping the slashes.
fn encode_path_segments(value: &str) -> String {
    value
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl<'a> UrlTemplate<'a> {
    pub fn parse(template: &'a str) -> Self {
        match join_path_args(template) {
            Some(args) => UrlTemplate::JoinPath {
                args: args.map(TemplateArg::parse).collect(),
            },
            None => UrlTemplate::Substitution { raw: template },
        }
    }

    pub fn evaluate(&self, version: &str, path: &str) -> String {
        match self {
            UrlTemplate::JoinPath { args } => args
                .iter()
                .map(|arg| match arg {
                    TemplateArg::Version => encode_path_segments(version),
                    TemplateArg::Path => encode_path_segments(path),
                    TemplateArg::Literal(literal) => literal.clone(),
                })
                .collect::<Vec<_>>()
                .join("/"),
            UrlTemplate::Substitution { raw } => raw
                .replace(VERSION_PLACEHOLDER, version)
                .replace(PATH_PLACEHOLDER, path),
        }
    }
}

/// Evaluate a file URL template, appending the line fragment when both the
/// fragment template and a line number are available.
///
/// ```
/// use zoekt_client::evaluate_file_url_template;
///
/// let url = evaluate_file_url_template(
///     r#"{{ URLJoinPath "https://example.com/repo" .Version .Path }}"#,
///     "main",
///     "src/a b.py",
///     Some("#L{{.LineNumber}}"),
///     Some(42),
/// );
/// assert_eq!(url, "https://example.com/repo/main/src/a%20b.py#L42");
/// ```
pub fn evaluate_file_url_template(
    template: &str,
    version: &str,
    path: &str,
    line_fragment_template: Option<&str>,
    line_number: Option<u32>,
) -> String {
    let mut url = UrlTemplate::parse(template).evaluate(version, path);
    if let (Some(fragment), Some(line)) = (line_fragment_template, line_number) {
        url.push_str(&fragment.replace(LINE_NUMBER_PLACEHOLDER, &line.to_string()));
    }
    url
}

/// Base repository URL: the first `URLJoinPath` argument, unquoted.
/// Empty for templates in the substitution form.
pub fn evaluate_repo_url_template(template: &str) -> String {
    join_path_args(template)
        .and_then(|mut args| args.next())
        .map(|first| strip_quotes(first.trim()).to_string())
        .unwrap_or_default()
}
