//! Name patterns.
//!
//! A pattern is a name or namespace fragment with up to three markers:
//!
//! - a leading `-` keeps matched types in the closure but never emits them,
//! - a leading `!` (after any `-`) removes matched candidates instead of adding them,
//! - a trailing `*` turns the match into a case-insensitive prefix match.

use std::{fmt, str::FromStr};

use crate::typegraph::QualifiedName;

/// A parsed type or member pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    text: String,
    is_wildcard: bool,
    is_reverse: bool,
    is_exclude: bool,
}

impl Pattern {
    /// Decompose `input` into its text and markers
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut text = input;
        let is_exclude = text.starts_with('-');
        if is_exclude {
            text = &text[1..];
        }

        let is_reverse = text.starts_with('!');
        if is_reverse {
            text = &text[1..];
        }

        let is_wildcard = text.ends_with('*');
        if is_wildcard {
            text = &text[..text.len() - 1];
        }

        Pattern {
            text: text.to_string(),
            is_wildcard,
            is_reverse,
            is_exclude,
        }
    }

    /// The pattern without its markers
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Trailing `*`
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.is_wildcard
    }

    /// Leading `!`
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        self.is_reverse
    }

    /// Leading `-`
    #[must_use]
    pub fn is_exclude(&self) -> bool {
        self.is_exclude
    }

    /// `*` alone
    #[must_use]
    pub fn matches_everything(&self) -> bool {
        self.is_wildcard && self.text.is_empty()
    }

    /// Match a type by full name, namespace or simple name
    #[must_use]
    pub fn matches_type(&self, name: &QualifiedName) -> bool {
        if self.matches_everything() {
            return true;
        }

        let full_name = name.full_name();
        if full_name == self.text
            || name.namespace().eq_ignore_ascii_case(&self.text)
            || name.name().eq_ignore_ascii_case(&self.text)
        {
            return true;
        }

        self.is_wildcard
            && (starts_with_ignore_case(&full_name, &self.text)
                || starts_with_ignore_case(name.name(), &self.text))
    }

    /// Match a method or field by name
    #[must_use]
    pub fn matches_member(&self, name: &str) -> bool {
        if self.matches_everything() || name == self.text {
            return true;
        }

        self.is_wildcard && starts_with_ignore_case(name, &self.text)
    }
}

impl FromStr for Pattern {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Pattern::parse(s))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_exclude {
            f.write_str("-")?;
        }
        if self.is_reverse {
            f.write_str("!")?;
        }
        f.write_str(&self.text)?;
        if self.is_wildcard {
            f.write_str("*")?;
        }
        Ok(())
    }
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value.len() >= prefix.len()
        && value.is_char_boundary(prefix.len())
        && value[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(full: &str) -> QualifiedName {
        QualifiedName::parse(full)
    }

    #[test]
    fn decomposition() {
        let pattern = Pattern::parse("-!Windows.Win32.UI*");
        assert!(pattern.is_exclude());
        assert!(pattern.is_reverse());
        assert!(pattern.is_wildcard());
        assert_eq!(pattern.text(), "Windows.Win32.UI");
        assert_eq!(pattern.to_string(), "-!Windows.Win32.UI*");

        let pattern = Pattern::parse("HWND");
        assert!(!pattern.is_exclude() && !pattern.is_reverse() && !pattern.is_wildcard());

        let pattern: Pattern = "*".parse().unwrap();
        assert!(pattern.matches_everything());
        assert!(pattern.matches_type(&name("A.B")));

        let pattern = Pattern::parse("!");
        assert!(pattern.is_reverse() && pattern.text().is_empty());
        assert!(!pattern.matches_everything());
    }

    #[test]
    fn exact_type_matches() {
        let hwnd = name("Windows.Win32.Foundation.HWND");

        assert!(Pattern::parse("Windows.Win32.Foundation.HWND").matches_type(&hwnd));
        assert!(!Pattern::parse("windows.win32.foundation.hwnd").matches_type(&hwnd));
        assert!(Pattern::parse("windows.win32.foundation").matches_type(&hwnd));
        assert!(Pattern::parse("hwnd").matches_type(&hwnd));
        assert!(!Pattern::parse("HWN").matches_type(&hwnd));
        assert!(!Pattern::parse("Windows.Win32").matches_type(&hwnd));
    }

    #[test]
    fn wildcard_type_matches() {
        let item = name("Windows.Win32.UI.Shell.IShellItem");

        assert!(Pattern::parse("IShell*").matches_type(&item));
        assert!(Pattern::parse("ishell*").matches_type(&item));
        assert!(Pattern::parse("Windows.Win32.UI*").matches_type(&item));
        assert!(Pattern::parse("Windows.Win32.UI.Shell.IShell*").matches_type(&item));
        assert!(!Pattern::parse("Shell*").matches_type(&item));
        assert!(!Pattern::parse("IShellFolder*").matches_type(&item));
    }

    #[test]
    fn wildcard_namespace_is_a_raw_prefix() {
        let pattern = Pattern::parse("Windows.Win32.Graphics.Direct3D*");

        assert!(pattern.matches_type(&name("Windows.Win32.Graphics.Direct3D.D3D_FEATURE_LEVEL")));
        assert!(pattern.matches_type(&name("Windows.Win32.Graphics.Direct3D.Fxc.D3DCOMPILE_FLAGS")));
        assert!(pattern.matches_type(&name("Windows.Win32.Graphics.Direct3D11.ID3D11Device")));

        let anchored = Pattern::parse("Windows.Win32.Graphics.Direct3D.*");
        assert!(anchored.matches_type(&name("Windows.Win32.Graphics.Direct3D.Fxc.D3DCOMPILE_FLAGS")));
        assert!(!anchored.matches_type(&name("Windows.Win32.Graphics.Direct3D11.ID3D11Device")));
    }

    #[test]
    fn member_matches() {
        assert!(Pattern::parse("MessageBoxW").matches_member("MessageBoxW"));
        assert!(!Pattern::parse("messageboxw").matches_member("MessageBoxW"));
        assert!(Pattern::parse("messagebox*").matches_member("MessageBoxW"));
        assert!(Pattern::parse("*").matches_member("Anything"));
        assert!(!Pattern::parse("Box*").matches_member("MessageBoxW"));
        assert!(!Pattern::parse("MessageBoxWithLongerName*").matches_member("MessageBoxW"));
    }
}
