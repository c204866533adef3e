//! Endpoint template resolution and URL path joining.
//!
//! The hosting API hands out hypermedia templates such as
//! `https://api.github.com/repos/octocat/hello/git/trees{/sha}`. These helpers
//! substitute placeholders and build request URLs without going through
//! [`url::Url`], so templates that are not yet valid URLs survive untouched.

/// Substitute a single path parameter in an endpoint template.
///
/// `{name}` becomes `value` and the optional-segment form `{/name}` becomes
/// `/value`. `name` may be passed bare (`sha`) or with its braces (`{sha}`,
/// `{/sha}`). A template without a matching placeholder is returned unchanged.
pub fn resolve_path_parameter(template: &str, name: &str, value: &str) -> String {
    let name = bare_parameter_name(name);
    template
        .replace(&format!("{{{name}}}"), value)
        .replace(&format!("{{/{name}}}"), &format!("/{value}"))
}

/// Resolve the same parameter across an ordered sequence of templates.
pub fn resolve_path_parameters<I, S>(templates: I, name: &str, value: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    templates
        .into_iter()
        .map(|t| resolve_path_parameter(t.as_ref(), name, value))
        .collect()
}

fn bare_parameter_name(name: &str) -> String {
    name.chars().filter(|c| !matches!(c, '{' | '}' | '/')).collect()
}

/// Join a base URL with path segments.
///
/// Repeated `/` are collapsed, exactly one `/` separates segments, and a
/// `://` scheme separator in the base is preserved. The trailing slash of the
/// final segment is kept, so `join_url("https://x.io/", ["a", "b/"])` yields
/// `https://x.io/a/b/`.
pub fn join_url<I, S>(base: &str, segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut url = match base.split_once("://") {
        Some((scheme, "")) => format!("{scheme}://"),
        Some((scheme, rest)) => {
            format!("{scheme}://{}", collapse_slashes(rest).trim_end_matches('/'))
        }
        None => collapse_slashes(base).trim_end_matches('/').to_string(),
    };

    let segments: Vec<S> = segments.into_iter().collect();
    let last = segments.len().saturating_sub(1);

    for (idx, segment) in segments.iter().enumerate() {
        let collapsed = collapse_slashes(segment.as_ref());
        let piece = if idx == last {
            collapsed.trim_start_matches('/')
        } else {
            collapsed.trim_matches('/')
        };

        if piece.is_empty() && idx != last {
            continue;
        }
        if !url.ends_with('/') {
            url.push('/');
        }
        url.push_str(piece);
    }

    url
}

/// Collapse runs of `/` into a single `/`.
fn collapse_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_slash = false;
    for c in s.chars() {
        if c == '/' {
            if !prev_slash {
                out.push(c);
            }
            prev_slash = true;
        } else {
            out.push(c);
            prev_slash = false;
        }
    }
    out
}
