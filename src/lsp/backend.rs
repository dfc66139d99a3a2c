//! LSP (Language Server Protocol) backend implementation
//!
//! Request handlers read the published grammar-table snapshot of the
//! document's analysis unit; document lifecycle events drive analysis runs.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::error;

use crate::analysis::{self, AnalysisManager, AnalysisUnit};
use crate::config::Settings;
use crate::grammar::preview::preview_line;
use crate::grammar::records::ErrorRecord;
use crate::grammar::{GrammarTable, SymbolMatch};
use crate::lsp::diagnostics::diagnostics_for_document;
use crate::lsp::position::{self, Token};

/// Pawn Language Server
pub struct PawnLanguageServer {
    client: Client,
    settings: RwLock<Settings>,
    manager: AnalysisManager,
    documents: RwLock<HashMap<Url, String>>,
}

impl PawnLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            settings: RwLock::new(Settings::default()),
            manager: AnalysisManager::new(),
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Run one analysis pass for `unit` and publish the resulting
    /// diagnostics to every open document the unit owns.
    async fn run_analysis(&self, unit: &Arc<AnalysisUnit>) {
        let settings = self.settings.read().await.clone();

        match analysis::run(unit, &settings).await {
            Ok(Some(outcome)) => self.publish_pass_diagnostics(unit, &outcome.errors).await,
            Ok(None) => {}
            Err(err) => {
                error!(%err, root = %unit.root().display(), "analysis run failed");
                self.client
                    .log_message(MessageType::ERROR, format!("Pawn analysis failed: {err}"))
                    .await;
            }
        }
    }

    async fn publish_pass_diagnostics(&self, unit: &Arc<AnalysisUnit>, errors: &[ErrorRecord]) {
        let open: Vec<Url> = self.documents.read().await.keys().cloned().collect();

        for uri in open {
            let Ok(path) = uri.to_file_path() else { continue };
            let Some(owner) = self.manager.unit_for(&path, false).await else {
                continue;
            };
            if !Arc::ptr_eq(&owner, unit) {
                continue;
            }

            // An empty list clears stale diagnostics from the previous pass.
            let diagnostics = diagnostics_for_document(errors, &path);
            self.client.publish_diagnostics(uri, diagnostics, None).await;
        }
    }

    /// The document source, its table snapshot, and its file scope — the
    /// common setup of every read-only query.
    async fn query_context(&self, uri: &Url) -> Option<(String, Arc<GrammarTable>, i32)> {
        let path = uri.to_file_path().ok()?;
        let source = self.documents.read().await.get(uri)?.clone();
        let unit = self.manager.unit_for(&path, false).await?;
        let table = unit.snapshot();
        let scope = table.file_index(&path);
        Some((source, table, scope))
    }

    /// Suppress language features inside strings and comments.
    fn position_is_plain_code(source: &str, position: Position) -> bool {
        let line = position::line_at(source, position.line);
        let character = position.character as usize;
        !position::is_in_string(line, character) && !position::is_in_comment(line, character)
    }

    fn hover_markdown(&self, source: &str, table: &GrammarTable, token: &Token, found: SymbolMatch<'_>) -> String {
        let mut value = format!("```pawn\n{}\n```", found.detail());

        match found {
            SymbolMatch::Constant(konst) if konst.is_enum_field() => {
                // Show the field inside its enumerator's elided body.
                if let Some(parent) = table.parent_enumerator_of(&konst.sym.name) {
                    let header_end = parent.sym.detail.find("{\n").unwrap_or(0);
                    value = format!(
                        "```pawn\n{}{{\n\t...,\n\t{},\n\t...\n}}\n```",
                        &parent.sym.detail[..header_end],
                        konst.sym.detail
                    );
                }
            }
            SymbolMatch::Substitute(_) => {
                // Append a one-shot expansion preview of the line tail.
                let line_end = source[token.start..]
                    .find('\n')
                    .map(|i| token.start + i)
                    .unwrap_or(source.len());
                let tail = &source[token.start..line_end];
                if let Some(expanded) = preview_line(tail, table.substitutions()) {
                    value.push_str(&format!("\n***\nReplaced to:\n```pawn\n{expanded}\n```"));
                }
            }
            _ => {}
        }

        value
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for PawnLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(options) = params.initialization_options {
            match serde_json::from_value::<Settings>(options) {
                Ok(settings) => *self.settings.write().await = settings,
                Err(err) => error!(%err, "invalid initialization options, using defaults"),
            }
        }

        if let Some(folders) = params.workspace_folders {
            let roots = folders
                .into_iter()
                .filter_map(|f| f.uri.to_file_path().ok())
                .collect();
            self.manager.add_workspace_folders(roots).await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    ..Default::default()
                }),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string(), ",".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "pawnls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "Pawn language server initialized")
            .await;

        for unit in self.manager.all_units().await {
            self.run_analysis(&unit).await;
        }
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let section = params
            .settings
            .get("pawn")
            .cloned()
            .unwrap_or(params.settings);

        match serde_json::from_value::<Settings>(section) {
            Ok(settings) => *self.settings.write().await = settings,
            Err(err) => {
                error!(%err, "invalid configuration update ignored");
                return;
            }
        }

        for unit in self.manager.all_units().await {
            self.run_analysis(&unit).await;
        }
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let removed = params
            .event
            .removed
            .into_iter()
            .filter_map(|f| f.uri.to_file_path().ok())
            .collect();
        self.manager.remove_workspace_folders(removed).await;

        let added = params
            .event
            .added
            .into_iter()
            .filter_map(|f| f.uri.to_file_path().ok())
            .collect();
        for unit in self.manager.add_workspace_folders(added).await {
            self.run_analysis(&unit).await;
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents
            .write()
            .await
            .insert(uri.clone(), params.text_document.text);

        let Ok(path) = uri.to_file_path() else { return };
        let Some(unit) = self.manager.unit_for(&path, true).await else {
            return;
        };

        // Workspace units were analyzed at startup; loose files get their
        // first pass when opened.
        if !unit.is_workspace() {
            self.run_analysis(&unit).await;
        } else {
            let errors = unit.last_errors();
            self.publish_pass_diagnostics(&unit, &errors).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // Full sync: the single change carries the whole document. The
        // symbol model only refreshes on save, when the analyzer can see the
        // file's on-disk contents.
        if let Some(change) = params.content_changes.into_iter().next() {
            self.documents
                .write()
                .await
                .insert(params.text_document.uri, change.text);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let Ok(path) = params.text_document.uri.to_file_path() else {
            return;
        };
        if let Some(unit) = self.manager.unit_for(&path, true).await {
            self.run_analysis(&unit).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.write().await.remove(&uri);
        self.client.publish_diagnostics(uri.clone(), vec![], None).await;

        if let Ok(path) = uri.to_file_path() {
            self.manager.remove_loose_unit(&path).await;
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some((source, table, scope)) = self.query_context(uri).await else {
            return Ok(None);
        };
        if !Self::position_is_plain_code(&source, position) {
            return Ok(None);
        }

        let Some(offset) = position::position_to_offset(&source, position) else {
            return Ok(None);
        };
        let Some(token) = position::previous_token(&source, offset) else {
            return Ok(None);
        };

        let Some(found) = table.find_symbol(&token.text, scope) else {
            return Ok(None);
        };

        Ok(Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value: self.hover_markdown(&source, &table, &token, found),
            }),
            range: None,
        }))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some((source, table, scope)) = self.query_context(uri).await else {
            return Ok(None);
        };
        if !Self::position_is_plain_code(&source, position) {
            return Ok(None);
        }

        let mut items = Vec::new();

        for en in table.enumerators() {
            items.push(CompletionItem {
                label: en.sym.name.clone(),
                kind: Some(CompletionItemKind::ENUM),
                detail: Some(en.sym.detail.clone()),
                ..Default::default()
            });
        }
        for sub in table.substitutions() {
            items.push(CompletionItem {
                label: sub.name_prefix().to_string(),
                kind: Some(CompletionItemKind::KEYWORD),
                detail: Some(sub.detail.clone()),
                ..Default::default()
            });
        }
        for tag in table.tags() {
            items.push(CompletionItem {
                label: format!("{}:", tag.name),
                kind: Some(CompletionItemKind::CLASS),
                detail: Some(tag.detail.clone()),
                ..Default::default()
            });
        }
        for konst in table.constant_expressions() {
            items.push(CompletionItem {
                label: konst.sym.name.clone(),
                kind: Some(CompletionItemKind::CONSTANT),
                detail: Some(konst.sym.detail.clone()),
                ..Default::default()
            });
        }
        for var in table.variables().iter().filter(|v| v.sym.visible_from(scope)) {
            items.push(CompletionItem {
                label: var.sym.name.clone(),
                kind: Some(CompletionItemKind::VARIABLE),
                detail: Some(var.sym.detail.clone()),
                ..Default::default()
            });
        }
        for func in table.functions().iter().filter(|f| f.sym.visible_from(scope)) {
            items.push(CompletionItem {
                label: func.sym.name.clone(),
                kind: Some(CompletionItemKind::FUNCTION),
                detail: Some(func.sym.detail.clone()),
                ..Default::default()
            });
        }

        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some((source, table, scope)) = self.query_context(uri).await else {
            return Ok(None);
        };
        if !Self::position_is_plain_code(&source, position) {
            return Ok(None);
        }

        let Some(call) = position::call_context(&source, position) else {
            return Ok(None);
        };
        let Some(open_offset) = position::position_to_offset(&source, call.open_paren) else {
            return Ok(None);
        };
        let Some(token) = position::previous_token(&source, open_offset) else {
            return Ok(None);
        };

        if let Some(sub) = table.find_substitute(&token.text) {
            return Ok(Some(SignatureHelp {
                signatures: vec![SignatureInformation {
                    label: sub.detail.clone(),
                    documentation: None,
                    parameters: Some(vec![]),
                    active_parameter: None,
                }],
                active_signature: Some(0),
                active_parameter: Some(0),
            }));
        }

        let Some(func) = table.find_function(&token.text, scope) else {
            return Ok(None);
        };

        let parameters: Vec<ParameterInformation> = func
            .args
            .iter()
            .map(|arg| ParameterInformation {
                label: ParameterLabel::Simple(arg.sym.detail.clone()),
                documentation: None,
            })
            .collect();
        let active = call.commas.min(func.args.len().saturating_sub(1)) as u32;

        Ok(Some(SignatureHelp {
            signatures: vec![SignatureInformation {
                label: func.sym.detail.clone(),
                documentation: None,
                parameters: Some(parameters),
                active_parameter: None,
            }],
            active_signature: Some(0),
            active_parameter: Some(active),
        }))
    }
}
