//! # External Collaborators
//!
//! Template storage, preview compilation and the product catalog live
//! outside the engine. Only their interfaces are fixed here, along with the
//! implementations the CLI and tests use.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preview compiler failed: {0}")]
    Compiler(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Persisted template storage
pub trait TemplateStore {
    fn load_template(&self, id: &str) -> Result<String, CollaboratorError>;

    fn save_template(&mut self, id: &str, markup: &str) -> Result<(), CollaboratorError>;
}

/// Markup → preview HTML, used for thumbnails and live preview
pub trait PreviewCompiler {
    fn compile_to_preview_html(&self, markup: &str) -> Result<String, CollaboratorError>;
}

/// Catalog entry offered when resolving product markers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: String,
    pub image_url: String,
    pub url: String,
}

pub trait ProductCatalog {
    fn list_catalog_products(&self) -> Result<Vec<Product>, CollaboratorError>;
}

impl ProductCatalog for Vec<Product> {
    fn list_catalog_products(&self) -> Result<Vec<Product>, CollaboratorError> {
        Ok(self.clone())
    }
}

/// One `<id>.mjml` file per template inside a directory
#[derive(Debug, Clone)]
pub struct FileTemplateStore {
    root: PathBuf,
}

impl FileTemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.mjml", id))
    }
}

impl TemplateStore for FileTemplateStore {
    fn load_template(&self, id: &str) -> Result<String, CollaboratorError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(CollaboratorError::NotFound(id.to_string()));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    fn save_template(&mut self, id: &str, markup: &str) -> Result<(), CollaboratorError> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.path_for(id), markup)?;
        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateStore {
    templates: HashMap<String, String>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, id: impl Into<String>, markup: impl Into<String>) -> Self {
        self.templates.insert(id.into(), markup.into());
        self
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.templates.get(id).map(String::as_str)
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load_template(&self, id: &str) -> Result<String, CollaboratorError> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(id.to_string()))
    }

    fn save_template(&mut self, id: &str, markup: &str) -> Result<(), CollaboratorError> {
        self.templates.insert(id.to_string(), markup.to_string());
        Ok(())
    }
}

/// Pipes markup through an external program (e.g. `mjml -s -i`) and reads
/// HTML from its stdout
#[derive(Debug, Clone)]
pub struct CommandPreviewCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandPreviewCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The MJML reference compiler reading stdin
    pub fn mjml() -> Self {
        Self::new("mjml", vec!["-s".to_string(), "-i".to_string()])
    }
}

impl PreviewCompiler for CommandPreviewCompiler {
    fn compile_to_preview_html(&self, markup: &str) -> Result<String, CollaboratorError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(markup.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(CollaboratorError::Compiler(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryTemplateStore::new().with_template("welcome", "<mjml></mjml>");
        assert_eq!(store.load_template("welcome").unwrap(), "<mjml></mjml>");

        store.save_template("welcome", "<mjml><mj-body></mj-body></mjml>").unwrap();
        assert_eq!(store.get("welcome"), Some("<mjml><mj-body></mj-body></mjml>"));
        assert!(matches!(
            store.load_template("missing"),
            Err(CollaboratorError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileTemplateStore::new(dir.path().join("templates"));

        assert!(matches!(
            store.load_template("promo"),
            Err(CollaboratorError::NotFound(_))
        ));
        store.save_template("promo", "<mjml></mjml>").unwrap();
        assert!(store.path_for("promo").ends_with("templates/promo.mjml"));
        assert_eq!(store.load_template("promo").unwrap(), "<mjml></mjml>");
    }

    #[test]
    fn test_missing_compiler_program_is_an_error() {
        let compiler = CommandPreviewCompiler::new("mailslot-no-such-compiler", vec![]);
        assert!(compiler.compile_to_preview_html("<mjml></mjml>").is_err());
    }

    #[test]
    fn test_product_deserializes_camel_case() {
        let product: Product = serde_json::from_str(
            r#"{"id":"p1","name":"Mug","price":"$12","imageUrl":"https://cdn/x.png","url":"https://shop/p1"}"#,
        )
        .unwrap();
        assert_eq!(product.image_url, "https://cdn/x.png");
    }
}
