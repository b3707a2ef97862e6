//! Named edit-config templates and subtree filters.
//!
//! A snippets directory holds `editconfigs/*.tmpl` and `filters/*.tmpl`,
//! Jinja-style templates rendered with JSON parameters. Undefined
//! variables are errors.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use log::{debug, info};
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde_json::Value;

use crate::error::{Error, Result, TemplateError};
use crate::git::GitRepo;

/// Repository the default snippets are installed from.
pub const SNIPPETS_REPO_URL: &str = "https://github.com/CiscoDevNet/ncc.git";

const TEMPLATE_SUFFIX: &str = ".tmpl";

/// Which template family to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetKind {
    EditConfig,
    Filter,
}

impl SnippetKind {
    fn dir_name(self) -> &'static str {
        match self {
            SnippetKind::EditConfig => "editconfigs",
            SnippetKind::Filter => "filters",
        }
    }
}

/// One loader per template family, rooted under a snippets directory.
pub struct Snippets {
    root: PathBuf,
    edit_configs: Environment<'static>,
    filters: Environment<'static>,
}

impl Snippets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let edit_configs = environment(root.join(SnippetKind::EditConfig.dir_name()));
        let filters = environment(root.join(SnippetKind::Filter.dir_name()));
        Self {
            root,
            edit_configs,
            filters,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn env(&self, kind: SnippetKind) -> &Environment<'static> {
        match kind {
            SnippetKind::EditConfig => &self.edit_configs,
            SnippetKind::Filter => &self.filters,
        }
    }

    /// Render the template `name` (without `.tmpl`).
    pub fn render(&self, kind: SnippetKind, name: &str, params: &Value) -> Result<String> {
        let template = self
            .env(kind)
            .get_template(&format!("{name}{TEMPLATE_SUFFIX}"))
            .map_err(TemplateError::Render)?;
        debug!("Rendering {} template {}", kind.dir_name(), name);
        Ok(template.render(params).map_err(TemplateError::Render)?)
    }

    /// Template names of a family, sorted, each with the variables it
    /// expects from the caller.
    pub fn list(&self, kind: SnippetKind) -> Result<Vec<(String, BTreeSet<String>)>> {
        let dir = self.root.join(kind.dir_name());
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let file_name = entry.file_name();
            if let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(TEMPLATE_SUFFIX)) {
                names.push(name.to_string());
            }
        }
        names.sort();

        let env = self.env(kind);
        names
            .into_iter()
            .map(|name| {
                let template = env
                    .get_template(&format!("{name}{TEMPLATE_SUFFIX}"))
                    .map_err(TemplateError::Render)?;
                let vars = template.undeclared_variables(false).into_iter().collect();
                Ok((name, vars))
            })
            .collect()
    }
}

fn environment(dir: PathBuf) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(dir));
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

/// Whether a render failed because the template used a variable that was
/// not supplied.
pub fn is_undefined_variable(err: &Error) -> bool {
    matches!(err, Error::Template(TemplateError::Render(e)) if e.kind() == ErrorKind::UndefinedError)
}

/// Format a template listing: `  name :{ "a" : "","b" : "" }` per line.
pub fn format_listing(header: &str, entries: &[(String, BTreeSet<String>)]) -> String {
    let mut out = format!("{header}\n");
    for (name, vars) in entries {
        out.push_str("  ");
        out.push_str(name);
        if !vars.is_empty() {
            let vars: Vec<String> = vars.iter().map(|v| format!("\"{v}\" : \"\"")).collect();
            out.push_str(" :{ ");
            out.push_str(&vars.join(","));
            out.push_str(" }");
        }
        out.push('\n');
    }
    out
}

/// Template parameters from `--params` JSON text or a `--params-file`;
/// an empty object when neither is given.
pub fn load_params(inline: Option<&str>, file: Option<&Path>) -> Result<Value> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?,
        (None, None) => return Ok(Value::Object(Default::default())),
    };
    Ok(serde_json::from_str(&text).map_err(TemplateError::Params)?)
}

/// Clone the snippets repository and move every top-level entry whose name
/// starts with `snippets` into `target`.
pub async fn install_snippets(url: &str, target: &Path) -> Result<Vec<PathBuf>> {
    let repo = GitRepo::clone(url).await?;
    let mut installed = Vec::new();

    let mut entries = tokio::fs::read_dir(repo.local_dir())
        .await
        .map_err(|e| Error::io(repo.local_dir(), e))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::io(repo.local_dir(), e))?
    {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("snippets") {
            continue;
        }
        let destination = target.join(&name);
        move_path(&entry.path(), &destination).await?;
        info!("Installed {}", destination.display());
        installed.push(destination);
    }

    repo.remove()?;
    Ok(installed)
}

/// Rename, falling back to copy when source and target are on different
/// filesystems.
async fn move_path(from: &Path, to: &Path) -> Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    copy_tree(from.to_path_buf(), to.to_path_buf()).await
}

fn copy_tree(
    from: PathBuf,
    to: PathBuf,
) -> futures_util::future::BoxFuture<'static, Result<()>> {
    Box::pin(async move {
        let meta = tokio::fs::metadata(&from)
            .await
            .map_err(|e| Error::io(&from, e))?;
        if !meta.is_dir() {
            tokio::fs::copy(&from, &to)
                .await
                .map_err(|e| Error::io(&to, e))?;
            return Ok(());
        }
        tokio::fs::create_dir_all(&to)
            .await
            .map_err(|e| Error::io(&to, e))?;
        let mut entries = tokio::fs::read_dir(&from)
            .await
            .map_err(|e| Error::io(&from, e))?;
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(&from, e))? {
            copy_tree(entry.path(), to.join(entry.file_name())).await?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snippets_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let edits = dir.path().join("editconfigs");
        let filters = dir.path().join("filters");
        std::fs::create_dir(&edits).unwrap();
        std::fs::create_dir(&filters).unwrap();

        std::fs::write(
            edits.join("intf-description.tmpl"),
            "<interface-configurations xmlns=\"http://cisco.com/ns/yang/Cisco-IOS-XR-ifmgr-cfg\">\n  \
             <interface-configuration>\n    <interface-name>{{ INTF_NAME }}</interface-name>\n    \
             <description>{{ DESCRIPTION }}</description>\n  </interface-configuration>\n\
             </interface-configurations>\n",
        )
        .unwrap();
        std::fs::write(edits.join("ntp-enable.tmpl"), "<ntp/>\n").unwrap();
        std::fs::write(edits.join("README.md"), "not a template").unwrap();
        std::fs::write(
            filters.join("interface-brief.tmpl"),
            "<interfaces><interface-briefs><interface-brief>\
             {% if INTF_NAME %}<interface-name>{{ INTF_NAME }}</interface-name>{% endif %}\
             </interface-brief></interface-briefs></interfaces>",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_render_edit_config() {
        let dir = snippets_dir();
        let snippets = Snippets::new(dir.path());
        let out = snippets
            .render(
                SnippetKind::EditConfig,
                "intf-description",
                &json!({"INTF_NAME": "GigabitEthernet0/0/0/0", "DESCRIPTION": "uplink"}),
            )
            .unwrap();
        assert!(out.contains("<interface-name>GigabitEthernet0/0/0/0</interface-name>"));
        assert!(out.contains("<description>uplink</description>"));
    }

    #[test]
    fn test_undefined_variable_is_reported() {
        let dir = snippets_dir();
        let snippets = Snippets::new(dir.path());
        let err = snippets
            .render(
                SnippetKind::EditConfig,
                "intf-description",
                &json!({"INTF_NAME": "Gi0"}),
            )
            .unwrap_err();
        assert!(is_undefined_variable(&err));
    }

    #[test]
    fn test_missing_template() {
        let dir = snippets_dir();
        let snippets = Snippets::new(dir.path());
        let err = snippets
            .render(SnippetKind::Filter, "nope", &json!({}))
            .unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::Render(_))));
        assert!(!is_undefined_variable(&err));
    }

    #[test]
    fn test_list_with_variables() {
        let dir = snippets_dir();
        let snippets = Snippets::new(dir.path());

        let edits = snippets.list(SnippetKind::EditConfig).unwrap();
        let names: Vec<&str> = edits.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["intf-description", "ntp-enable"]);
        assert_eq!(
            edits[0].1.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["DESCRIPTION", "INTF_NAME"]
        );
        assert!(edits[1].1.is_empty());

        let listing = format_listing("Edit-config templates:", &edits);
        assert_eq!(
            listing,
            "Edit-config templates:\n  \
             intf-description :{ \"DESCRIPTION\" : \"\",\"INTF_NAME\" : \"\" }\n  \
             ntp-enable\n"
        );
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let snippets = Snippets::new(dir.path());
        assert!(snippets.list(SnippetKind::Filter).unwrap().is_empty());
    }

    #[test]
    fn test_load_params() {
        assert_eq!(load_params(None, None).unwrap(), json!({}));
        assert_eq!(
            load_params(Some(r#"{"INTF_NAME": "Gi0"}"#), None).unwrap(),
            json!({"INTF_NAME": "Gi0"})
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"DESCRIPTION": "x"}"#).unwrap();
        assert_eq!(
            load_params(None, Some(&path)).unwrap(),
            json!({"DESCRIPTION": "x"})
        );

        assert!(matches!(
            load_params(Some("{"), None),
            Err(Error::Template(TemplateError::Params(_)))
        ));
    }

    #[tokio::test]
    async fn test_copy_tree() {
        let src = snippets_dir();
        let dst = tempfile::tempdir().unwrap();
        let target = dst.path().join("snippets");
        copy_tree(src.path().to_path_buf(), target.clone()).await.unwrap();
        assert!(target.join("editconfigs/ntp-enable.tmpl").exists());
        assert!(target.join("filters/interface-brief.tmpl").exists());
    }
}
