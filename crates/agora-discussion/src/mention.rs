//! `@name` autocomplete for the message composer.
//!
//! Carets are byte offsets into the text. An offset that falls inside a
//! multi-byte character is moved back to the start of that character.

use agora_types::models::Author;

/// The partial `@name` being typed at the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionQuery {
    /// Byte offset of the `@`
    pub start: usize,
    /// Lowercased text between the `@` and the caret
    pub term: String,
}

/// Find the mention being typed just before `caret`, if any.
///
/// The nearest `@` before the caret that is not escaped as `\@` starts the
/// query. If anything between it and the caret is whitespace, the user has
/// moved past the mention and there is no active query.
pub fn active_mention(text: &str, caret: usize) -> Option<MentionQuery> {
    let caret = floor_boundary(text, caret);
    let before = &text[..caret];

    let mut search = before;
    loop {
        let at = search.rfind('@')?;
        if search[..at].ends_with('\\') {
            search = &search[..at];
            continue;
        }
        let term = &before[at + 1..];
        if term.chars().any(char::is_whitespace) {
            return None;
        }
        return Some(MentionQuery {
            start: at,
            term: term.to_lowercase(),
        });
    }
}

/// Users whose name contains `term`, ignoring case. Names starting with the
/// term come first; otherwise the input order is kept.
pub fn suggestions<'a>(term: &str, users: &'a [Author]) -> Vec<&'a Author> {
    let term = term.to_lowercase();
    let mut prefix = Vec::new();
    let mut rest = Vec::new();
    for user in users {
        if prefix.iter().chain(rest.iter()).any(|u: &&Author| u.id == user.id) {
            continue;
        }
        let name = user.name.to_lowercase();
        if name.starts_with(&term) {
            prefix.push(user);
        } else if name.contains(&term) {
            rest.push(user);
        }
    }
    prefix.extend(rest);
    prefix
}

/// Replace the partial query with `@name ` and return the new text and caret.
/// The caret lands right after the inserted space.
pub fn apply_mention(text: &str, query: &MentionQuery, caret: usize, name: &str) -> (String, usize) {
    let caret = floor_boundary(text, caret).max(query.start);
    let mut out = String::with_capacity(text.len() + name.len() + 2);
    out.push_str(&text[..query.start]);
    out.push('@');
    out.push_str(name);
    out.push(' ');
    let new_caret = out.len();
    out.push_str(&text[caret..]);
    (out, new_caret)
}

/// Names mentioned in posted content, in order of first appearance.
pub fn mentioned_names(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let mut prev = None;
    for (i, c) in content.char_indices() {
        if c == '@' && prev != Some('\\') && !prev.is_some_and(is_name_char) {
            let name: String = content[i + 1..]
                .chars()
                .take_while(|&c| is_name_char(c))
                .collect();
            let name = name.trim_end_matches(['.', '-']);
            if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                names.push(name.to_string());
            }
        }
        prev = Some(c);
    }
    names
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

fn floor_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// The message input box: its text, caret and the mention being typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    text: String,
    caret: usize,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn caret(&self) -> usize {
        self.caret
    }

    /// Replace the whole input, as on every keystroke.
    pub fn set(&mut self, text: impl Into<String>, caret: usize) {
        self.text = text.into();
        self.caret = floor_boundary(&self.text, caret);
    }

    pub fn move_caret(&mut self, caret: usize) {
        self.caret = floor_boundary(&self.text, caret);
    }

    /// Type `s` at the caret.
    pub fn insert(&mut self, s: &str) {
        self.text.insert_str(self.caret, s);
        self.caret += s.len();
    }

    pub fn query(&self) -> Option<MentionQuery> {
        active_mention(&self.text, self.caret)
    }

    /// Whether the suggestion list should be shown.
    pub fn is_suggesting(&self) -> bool {
        self.query().is_some()
    }

    pub fn suggestions<'a>(&self, users: &'a [Author]) -> Vec<&'a Author> {
        match self.query() {
            Some(query) => suggestions(&query.term, users),
            None => Vec::new(),
        }
    }

    /// Complete the active query with `name`. Returns false if nothing was
    /// being typed.
    pub fn select(&mut self, name: &str) -> bool {
        let Some(query) = self.query() else {
            return false;
        };
        let (text, caret) = apply_mention(&self.text, &query, self.caret, name);
        self.text = text;
        self.caret = caret;
        true
    }

    /// Empty the box and hand back what was typed.
    pub fn take(&mut self) -> String {
        self.caret = 0;
        std::mem::take(&mut self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::models::Role;

    fn user(id: i64, name: &str) -> Author {
        Author {
            id,
            name: name.into(),
            avatar: String::new(),
            role: Role::User,
        }
    }

    #[test]
    fn query_at_caret() {
        let text = "hello @sa";
        let query = active_mention(text, text.len()).unwrap();
        assert_eq!(query.term, "sa");
        assert_eq!(query.start, 6);
    }

    #[test]
    fn whitespace_after_at_ends_query() {
        let text = "hello @sara friend";
        assert_eq!(active_mention(text, text.len()), None);
        assert!(active_mention(text, 11).is_some());
    }

    #[test]
    fn escaped_at_is_ignored() {
        assert_eq!(active_mention("mail me \\@home", 14), None);
        let query = active_mention("@Jo\\@x", 6).unwrap();
        assert_eq!(query.start, 0);
        assert_eq!(query.term, "jo\\@x");
    }

    #[test]
    fn bare_at_is_an_empty_query() {
        let query = active_mention("hi @", 4).unwrap();
        assert_eq!(query.term, "");
        assert_eq!(active_mention("no mention", 10), None);
    }

    #[test]
    fn caret_inside_multibyte_char_is_clamped() {
        let text = "@é";
        assert_eq!(active_mention(text, 2).unwrap().term, "");
        assert_eq!(active_mention(text, 99).unwrap().term, "é");
    }

    #[test]
    fn prefix_matches_first() {
        let users = vec![user(1, "Lisa"), user(2, "sam"), user(3, "Sara"), user(4, "bob")];
        let names: Vec<_> = suggestions("sa", &users).iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["sam", "Sara", "Lisa"]);
        assert_eq!(suggestions("", &users).len(), 4);
    }

    #[test]
    fn selecting_splices_name_and_moves_caret() {
        let mut composer = Composer::new();
        composer.set("hey @sa how are you", 7);
        assert!(composer.is_suggesting());

        assert!(composer.select("sara"));
        assert_eq!(composer.text(), "hey @sara  how are you");
        assert_eq!(composer.caret(), "hey @sara ".len());
        assert!(!composer.is_suggesting());
    }

    #[test]
    fn select_without_query_does_nothing() {
        let mut composer = Composer::new();
        composer.insert("plain");
        assert!(!composer.select("sara"));
        assert_eq!(composer.take(), "plain");
        assert_eq!(composer.text(), "");
    }

    #[test]
    fn names_extracted_from_content() {
        let names = mentioned_names("thanks @sara, ping @Bob_2. and @sara again; me\\@x a@b");
        assert_eq!(names, vec!["sara", "Bob_2"]);
    }
}
