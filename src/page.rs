//! Post editor page controller.
//!
//! `PostPage` owns everything the editor page keeps between events: the form
//! values, the metadata table and the unsaved guard. A page is rebuilt from
//! the store after every save or delete, which is the only way back to a
//! clean state.

use anyhow::Result;

use crate::error::AdminError;
use crate::guard::{DeleteEndpoint, DeleteForm, DeleteOutcome, Prompter, UnsavedGuard};
use crate::listing::{format_timestamp, parse_timestamp};
use crate::meta::MetaTable;
use crate::store::Post;

/// Text inputs of the post form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostField {
    Title,
    Provide,
    Tags,
    Excerpt,
    Creation,
}

impl PostField {
    pub const ALL: [PostField; 5] = [
        PostField::Title,
        PostField::Provide,
        PostField::Tags,
        PostField::Excerpt,
        PostField::Creation,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PostField::Title => "TITLE",
            PostField::Provide => "PROVIDE",
            PostField::Tags => "TAGS",
            PostField::Excerpt => "EXCERPT",
            PostField::Creation => "CREATED",
        }
    }
}

/// Checkbox inputs of the post form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostFlag {
    Visible,
    Index,
}

impl PostFlag {
    pub const ALL: [PostFlag; 2] = [PostFlag::Visible, PostFlag::Index];

    pub fn label(self) -> &'static str {
        match self {
            PostFlag::Visible => "VISIBLE",
            PostFlag::Index => "INDEX",
        }
    }
}

/// Split a tags input on newlines and commas.
pub fn parse_tags(input: &str) -> impl Iterator<Item = String> + '_ {
    input
        .lines()
        .flat_map(|line| line.split(','))
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
}

/// Result of submitting the post form. Inputs that could not be applied are
/// reported in `rejected`; the rest of the form is still saved.
#[derive(Debug)]
pub struct Submission {
    pub post: Post,
    pub rejected: Vec<AdminError>,
}

#[derive(Debug, Clone)]
pub struct PostPage {
    post: Post,
    title: String,
    provide: String,
    tags: String,
    excerpt: String,
    creation: String,
    visible: bool,
    index: bool,
    meta: MetaTable,
    files: Vec<String>,
    guard: UnsavedGuard,
    delete_form: DeleteForm,
}

impl PostPage {
    pub fn new(post: Post, files: Vec<String>, guard: UnsavedGuard) -> Self {
        let tags = post.tags.iter().cloned().collect::<Vec<_>>().join(", ");
        Self {
            title: post.title.clone(),
            provide: post.provide.clone(),
            tags,
            excerpt: post.excerpt.clone(),
            creation: format_timestamp(post.creation),
            visible: post.public,
            index: post.indexed,
            meta: MetaTable::from_pairs(post.meta.clone()),
            files,
            guard,
            delete_form: DeleteForm::default(),
            post,
        }
    }

    pub fn slug(&self) -> &str {
        &self.post.slug
    }

    pub fn post(&self) -> &Post {
        &self.post
    }

    pub fn field(&self, field: PostField) -> &str {
        match field {
            PostField::Title => &self.title,
            PostField::Provide => &self.provide,
            PostField::Tags => &self.tags,
            PostField::Excerpt => &self.excerpt,
            PostField::Creation => &self.creation,
        }
    }

    pub fn flag(&self, flag: PostFlag) -> bool {
        match flag {
            PostFlag::Visible => self.visible,
            PostFlag::Index => self.index,
        }
    }

    pub fn meta(&self) -> &MetaTable {
        &self.meta
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn is_dirty(&self) -> bool {
        self.guard.is_dirty()
    }

    pub fn delete_form(&self) -> &DeleteForm {
        &self.delete_form
    }

    /// Commit a text input. A change event only fires if the value differs.
    pub fn change_field(&mut self, field: PostField, value: impl Into<String>) -> bool {
        let value = value.into();
        let slot = match field {
            PostField::Title => &mut self.title,
            PostField::Provide => &mut self.provide,
            PostField::Tags => &mut self.tags,
            PostField::Excerpt => &mut self.excerpt,
            PostField::Creation => &mut self.creation,
        };
        if *slot == value {
            return false;
        }
        *slot = value;
        self.guard.mark_changed();
        true
    }

    pub fn toggle_flag(&mut self, flag: PostFlag) {
        let slot = match flag {
            PostFlag::Visible => &mut self.visible,
            PostFlag::Index => &mut self.index,
        };
        *slot = !*slot;
        self.guard.mark_changed();
    }

    /// Commit a metadata key. Returns true when a new trailing row appeared.
    pub fn change_meta_key(&mut self, row: usize, value: impl Into<String>) -> bool {
        let value = value.into();
        let Some(current) = self.meta.get(row) else {
            return false;
        };
        if current.key == value {
            return false;
        }
        self.guard.mark_changed();
        self.meta.on_key_change(row, value)
    }

    pub fn change_meta_value(&mut self, row: usize, value: impl Into<String>) -> bool {
        let value = value.into();
        let Some(current) = self.meta.get(row) else {
            return false;
        };
        if current.value == value {
            return false;
        }
        self.meta.on_value_change(row, value);
        self.guard.mark_changed();
        true
    }

    pub fn check_unsaved(&self, prompter: &mut dyn Prompter) -> Result<bool> {
        self.guard.check_unsaved(prompter)
    }

    /// Delete control next to the file at `index`.
    pub fn delete_file(
        &mut self,
        index: usize,
        prompter: &mut dyn Prompter,
        endpoint: &mut dyn DeleteEndpoint,
    ) -> Result<DeleteOutcome> {
        let Some(name) = self.files.get(index) else {
            return Ok(DeleteOutcome::Declined);
        };
        self.guard
            .delete_file(name, &mut self.delete_form, prompter, endpoint)
    }

    /// The post as the form would submit it. The creation date is only
    /// re-parsed when edited (the input has minute precision); an unparsable
    /// one keeps the stored value.
    pub fn submit(&self) -> Submission {
        let mut rejected = Vec::new();
        let mut post = self.post.clone();
        if self.creation != format_timestamp(post.creation) {
            match parse_timestamp(&self.creation) {
                Some(creation) => post.creation = creation,
                None => rejected.push(AdminError::InvalidTimestamp(self.creation.clone())),
            }
        }
        post.title = self.title.clone();
        post.provide = self.provide.trim().to_string();
        post.excerpt = self.excerpt.clone();
        post.public = self.visible;
        post.indexed = self.index;
        post.tags = parse_tags(&self.tags).collect();
        post.meta = self.meta.entries();
        Submission { post, rejected }
    }
}
