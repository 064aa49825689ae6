//! TOML drafts: the offline stand-in for filling the wizard in by hand.
//!
//! ```toml
//! startup_name = "Acme Analytics"
//! incorporation_date = 2023-04-01
//! num_founders = 2
//! logo = "acme-logo.png"
//! terms_accepted = true
//!
//! [[founders]]
//! name = "Asha Rao"
//! email = "asha@acme.io"
//! role = "CEO"
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use client_core::UploadFile;
use serde::Deserialize;
use wizard::{Field, FounderEntry, ProfileForm};

#[derive(Debug, Default, Deserialize)]
pub struct ProfileDraft {
    #[serde(default)]
    pub founders: Vec<FounderEntry>,
    #[serde(default)]
    pub products: Vec<String>,
    /// Legacy JSON text; replaces `founders` when present.
    #[serde(default)]
    pub founders_json: Option<String>,
    #[serde(default)]
    pub products_json: Option<String>,
    #[serde(default)]
    pub logo: Option<PathBuf>,
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(flatten)]
    pub fields: BTreeMap<String, toml::Value>,
}

impl ProfileDraft {
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("draft is not valid TOML")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read draft {}", path.display()))?;
        Self::parse(&contents)
    }

    /// Fills a form from the draft. Logo loading is separate, see [`load_logo`].
    pub fn to_form(&self) -> Result<ProfileForm> {
        let mut form = ProfileForm {
            founders: self.founders.clone(),
            products: self.products.clone(),
            terms_accepted: self.terms_accepted,
            ..ProfileForm::default()
        };

        for (name, value) in &self.fields {
            let field = Field::from_name(name)
                .filter(|field| field.is_text())
                .ok_or_else(|| anyhow!("unknown draft field '{name}'"))?;
            let text = match value {
                toml::Value::String(text) => text.clone(),
                toml::Value::Integer(number) => number.to_string(),
                toml::Value::Float(number) => number.to_string(),
                toml::Value::Datetime(date) => date.to_string(),
                other => bail!("draft field '{name}' must be a plain value, got {}", other.type_str()),
            };
            form.set_text(field, text)?;
        }

        if let Some(json) = &self.founders_json {
            form.import_founders_json(json)?;
        }
        if let Some(json) = &self.products_json {
            form.import_products_json(json)?;
        }
        Ok(form)
    }

    /// The logo path resolved against the draft's directory.
    pub fn logo_path(&self, draft_path: &Path) -> Option<PathBuf> {
        let logo = self.logo.as_ref()?;
        if logo.is_absolute() {
            return Some(logo.clone());
        }
        let base = draft_path.parent().unwrap_or_else(|| Path::new("."));
        Some(base.join(logo))
    }
}

pub async fn load_logo(path: &Path) -> Result<UploadFile> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("logo path {} has no file name", path.display()))?
        .to_string();
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read logo {}", path.display()))?;
    let content_type = mime_guess::from_path(path).first_raw().map(str::to_string);

    Ok(UploadFile {
        filename,
        content_type,
        content,
    })
}
