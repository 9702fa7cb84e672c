//! # Interactive Shell
//!
//! A line-oriented front end over a [`Workspace`]. Gateway results are
//! applied between commands, or as soon as they arrive while the prompt is
//! idle, so a fresh query tab is always listed in its loading state first.

use crate::grid::{parse_ranges, GridState, TabGrid};
use crate::render;
use dq_core::parser::parse_conditions;
use dq_core::{AggregationRequest, GridSnapshot, GridView, TabId};
use dq_engine::Workspace;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

const DEFAULT_SHOW_LIMIT: usize = 20;

const HELP: &str = "\
Commands:
  modules                      list registered modules
  open <module>                open (or switch to) a module
  close module [n]             close the n-th open module (default: active)
  query [conditions]           run a query, e.g. query currency = USD AND amount > 100
  agg                          show aggregation choices for the active module
  agg <field> by <a,b,...>     sum <field> grouped by the listed fields
  select <1-3,5> | none        select rows of the active tab
  filter <text> | none         quick-filter the active tab
  tabs                         list result tabs
  tab <n>                      switch to the n-th result tab
  close [n]                    close the n-th result tab (default: active)
  show [limit]                 print the active tab
  help                         this text
  quit                         leave the shell";

enum Event {
    Line(Option<String>),
    Settled,
}

pub struct Shell {
    workspace: Workspace,
    grids: HashMap<(String, TabId), GridState>,
    pending: HashSet<(String, TabId)>,
}

impl Shell {
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace,
            grids: HashMap::new(),
            pending: HashSet::new(),
        }
    }

    pub async fn open(&mut self, module: &str) {
        match self.workspace.open_module(module).await {
            Ok(_) => self.print_tabs(),
            Err(e) => println!("{}", e),
        }
    }

    pub async fn run(mut self) -> std::io::Result<()> {
        println!("TABQUERY shell. Type 'help' for commands.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            self.drain();
            print!("dq> ");
            std::io::stdout().flush()?;

            let waiting = self
                .workspace
                .active()
                .map_or(false, |m| m.session.in_flight() > 0);
            let event = tokio::select! {
                line = lines.next_line() => Event::Line(line?),
                _ = next_active_update(&mut self.workspace), if waiting => Event::Settled,
            };

            match event {
                Event::Line(None) => break,
                Event::Line(Some(line)) => {
                    if !self.handle(line.trim()).await {
                        break;
                    }
                }
                Event::Settled => println!(),
            }
        }
        Ok(())
    }

    /// Apply arrived results in every open module and report settled tabs.
    fn drain(&mut self) {
        for module in self.workspace.open_tabs_mut() {
            module.session.apply_completions();
        }
        let settled: Vec<(String, TabId)> = self
            .pending
            .iter()
            .filter(|(module, id)| {
                self.workspace
                    .open_tabs()
                    .iter()
                    .find(|m| &m.id == module)
                    .and_then(|m| m.session.tabs().iter().find(|t| t.id() == *id))
                    .map_or(true, |t| !t.is_pending())
            })
            .cloned()
            .collect();
        for key in settled {
            self.pending.remove(&key);
            let tab = self
                .workspace
                .open_tabs()
                .iter()
                .find(|m| m.id == key.0)
                .and_then(|m| m.session.tabs().iter().find(|t| t.id() == key.1));
            if let Some(tab) = tab {
                println!("[{}] {} ({} rows)", key.0, tab.title(), tab.rows().len());
            }
        }
    }

    /// Returns `false` when the shell should exit.
    async fn handle(&mut self, line: &str) -> bool {
        let (cmd, rest) = match line.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (line, ""),
        };
        let result = match cmd {
            "" => Ok(()),
            "quit" | "exit" => return false,
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "modules" => {
                let open: Vec<&str> = self
                    .workspace
                    .open_tabs()
                    .iter()
                    .map(|m| m.id.as_str())
                    .collect();
                println!(
                    "{}",
                    render::modules_table(self.workspace.available(), &open)
                );
                Ok(())
            }
            "open" if !rest.is_empty() => {
                self.open(rest).await;
                Ok(())
            }
            "query" => self.query(rest),
            "agg" => self.aggregate(rest),
            "select" => self.select(rest),
            "filter" => self.filter(rest),
            "tabs" => {
                self.print_tabs();
                Ok(())
            }
            "tab" => self.switch_tab(rest),
            "close" => self.close(rest),
            "show" => self.show(rest),
            _ => Err(format!("unknown command '{}', try 'help'", line)),
        };
        if let Err(e) = result {
            println!("{}", e);
        }
        true
    }

    fn active_module(&self) -> Result<&dq_engine::ModuleTab, String> {
        self.workspace
            .active()
            .ok_or_else(|| "no module open, try 'open xms'".to_string())
    }

    fn active_key(&self) -> Result<(String, TabId), String> {
        let module = self.active_module()?;
        let tab = module
            .session
            .active_tab()
            .ok_or_else(|| "no tab open".to_string())?;
        Ok((module.id.clone(), tab.id()))
    }

    fn query(&mut self, rest: &str) -> Result<(), String> {
        let conditions = parse_conditions(rest).map_err(|e| e.to_string())?;
        let module = self
            .workspace
            .active_mut()
            .ok_or_else(|| "no module open, try 'open xms'".to_string())?;
        let id = module.session.submit(conditions);
        self.pending.insert((module.id.clone(), id));
        self.print_tabs();
        Ok(())
    }

    fn aggregate(&mut self, rest: &str) -> Result<(), String> {
        if rest.is_empty() {
            let dialog = self.active_module()?.session.aggregation_dialog();
            println!("Columns:         {}", dialog.columns.join(", "));
            println!("Numeric columns: {}", dialog.numeric_columns.join(", "));
            println!("Group-by fields: {}", dialog.group_by_fields.join(", "));
            println!(
                "Default:         agg {} by {}",
                dialog.default_request.aggregate_field,
                dialog.default_request.group_by.join(",")
            );
            return Ok(());
        }

        let (field, group_by) = rest
            .split_once(" by ")
            .ok_or_else(|| "usage: agg <field> by <a,b,...>".to_string())?;
        let field = field.trim();
        let request = AggregationRequest::new(
            group_by
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty()),
            field,
        );

        let numeric = &self.active_module()?.session.config().numeric_columns;
        if !numeric.is_empty() && !numeric.iter().any(|c| c == field) {
            return Err(format!(
                "'{}' is not numeric, choose one of: {}",
                field,
                numeric.join(", ")
            ));
        }

        // Snapshot the grid before handing the session a mutable borrow.
        let snapshot = {
            let key = self.active_key()?;
            let state = self.grids.get(&key).cloned().unwrap_or_default();
            let module = self.active_module()?;
            match module.session.active_tab() {
                Some(tab) => {
                    let grid = TabGrid {
                        tab,
                        state: &state,
                    };
                    GridSnapshot {
                        selection: grid.current_selection(),
                        visible: grid.currently_visible_rows(),
                    }
                }
                None => GridSnapshot::default(),
            }
        };

        let module = self
            .workspace
            .active_mut()
            .ok_or_else(|| "no module open".to_string())?;
        match module.session.run_aggregation(&request, &snapshot) {
            Some(_) => {
                self.show("")?;
                Ok(())
            }
            None => Err("nothing to aggregate: pick at least one group-by field".into()),
        }
    }

    fn select(&mut self, rest: &str) -> Result<(), String> {
        let key = self.active_key()?;
        let len = self
            .active_module()?
            .session
            .active_tab()
            .map_or(0, |t| t.rows().len());
        let selected = match rest {
            "" => return Err("usage: select <1-3,5> | none".into()),
            "none" => Vec::new(),
            ranges => parse_ranges(ranges, len)?,
        };
        println!("{} rows selected", selected.len());
        self.grids.entry(key).or_default().selected = selected;
        Ok(())
    }

    fn filter(&mut self, rest: &str) -> Result<(), String> {
        let key = self.active_key()?;
        let filter = match rest {
            "" | "none" => None,
            text => Some(text.to_string()),
        };
        self.grids.entry(key).or_default().quick_filter = filter;
        self.show("")
    }

    fn switch_tab(&mut self, rest: &str) -> Result<(), String> {
        let index = parse_index(rest)?;
        let module = self
            .workspace
            .active_mut()
            .ok_or_else(|| "no module open".to_string())?;
        if !module.session.set_active(index) {
            return Err(format!("no tab {}", index + 1));
        }
        self.print_tabs();
        Ok(())
    }

    fn close(&mut self, rest: &str) -> Result<(), String> {
        if let Some(which) = rest.strip_prefix("module") {
            let index = match which.trim() {
                "" => self.workspace.active_index(),
                n => parse_index(n)?,
            };
            let removed = self
                .workspace
                .close_module(index)
                .ok_or_else(|| format!("no module {}", index + 1))?;
            self.grids.retain(|(module, _), _| module != &removed.id);
            self.pending.retain(|(module, _)| module != &removed.id);
            println!("closed {}", removed.title);
            return Ok(());
        }

        let module = self
            .workspace
            .active_mut()
            .ok_or_else(|| "no module open".to_string())?;
        let index = match rest {
            "" => module.session.active_index(),
            n => parse_index(n)?,
        };
        let removed = module
            .session
            .close_tab(index)
            .ok_or_else(|| format!("no tab {}", index + 1))?;
        let key = (module.id.clone(), removed.id());
        self.grids.remove(&key);
        self.print_tabs();
        Ok(())
    }

    fn show(&self, rest: &str) -> Result<(), String> {
        let limit = match rest {
            "" => DEFAULT_SHOW_LIMIT,
            n => n
                .parse::<usize>()
                .map_err(|_| format!("'{}' is not a row count", n))?,
        };
        let module = self.active_module()?;
        let tab = module
            .session
            .active_tab()
            .ok_or_else(|| "no tab open".to_string())?;
        if tab.is_pending() {
            println!("{}", tab.title());
            return Ok(());
        }

        let state = self
            .grids
            .get(&(module.id.clone(), tab.id()))
            .cloned()
            .unwrap_or_default();
        let visible = state.visible(tab);
        let columns = render::columns_for(tab, module.session.config());
        let shown = &visible[..visible.len().min(limit)];

        println!("{}", tab.title());
        println!("{}", render::rows_table(&columns, shown));
        let mut footer = format!("{} of {} rows", shown.len(), tab.rows().len());
        if let Some(filter) = &state.quick_filter {
            footer.push_str(&format!(", filter '{}' matches {}", filter, visible.len()));
        }
        if !state.selected.is_empty() {
            footer.push_str(&format!(", {} selected", state.selected.len()));
        }
        println!("{}", footer);
        Ok(())
    }

    fn print_tabs(&self) {
        let strip: Vec<String> = self
            .workspace
            .open_tabs()
            .iter()
            .enumerate()
            .map(|(i, m)| {
                if i == self.workspace.active_index() {
                    format!("[{}]", m.id)
                } else {
                    m.id.clone()
                }
            })
            .collect();
        if strip.is_empty() {
            println!("no module open");
            return;
        }
        println!("Modules: {}", strip.join("  "));
        if let Some(module) = self.workspace.active() {
            println!(
                "{}",
                render::tabs_table(module.session.tabs(), module.session.active_index())
            );
        }
    }
}

async fn next_active_update(workspace: &mut Workspace) -> bool {
    match workspace.active_mut() {
        Some(module) => module.session.next_update().await,
        None => false,
    }
}

/// 1-based user index to 0-based position.
fn parse_index(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("'{}' is not a tab number", s.trim())),
    }
}
