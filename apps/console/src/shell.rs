//! Line-oriented front end. The shell owns the session state, routes each
//! command to the page that handles it, and prints the page and any
//! pending notices afterwards.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tracing::debug;

use crate::errors::CommandError;
use crate::files::{format_bytes, FileCandidate};
use crate::models::{ResumeDetail, ScoreBand, SkillMatch};
use crate::pages::dashboard::{Dashboard, MountedDashboard};
use crate::pages::history::{ListItem, ListPage, MatchList, ResumeList};
use crate::pages::match_detail::{DetailStatus, MatchDetailPage};
use crate::pages::matcher::{AnalysisStatus, MatchPage, MatchStatus, MAX_JD_CHARS};
use crate::pages::upload::UploadPage;
use crate::pages::{Navigation, Redirect};
use crate::realtime::ChangeFeed;
use crate::state::AppState;

pub const HELP: &str = "\
Commands:
  dashboard               stats and recent resumes (live)
  resumes [query]         list resumes, optionally filtered
  matches [query]         list past matches, optionally filtered
  upload <path>           upload a PDF or DOCX resume
  select <id>             make a resume the current selection
  jd <text>               set the job description
  match                   score the selected resume against the job description
  analyze                 AI coaching for the selected resume
  show-match <id>         open a stored match
  delete-resume <id>      delete a resume
  delete-match <id>       delete a match
  help                    show this text
  quit                    exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dashboard,
    Resumes(String),
    Matches(String),
    Upload(String),
    Select(i64),
    JobDescription(String),
    Match,
    Analyze,
    ShowMatch(i64),
    DeleteResume(i64),
    DeleteMatch(i64),
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "dashboard" | "home" => Command::Dashboard,
            "resumes" => Command::Resumes(rest.to_string()),
            "matches" | "history" => Command::Matches(rest.to_string()),
            "upload" => Command::Upload(required(rest, "upload", "a file path")?.to_string()),
            "select" => Command::Select(parse_id(rest, "select")?),
            "jd" => Command::JobDescription(
                required(rest, "jd", "the job description text")?.to_string(),
            ),
            "match" => Command::Match,
            "analyze" | "coach" => Command::Analyze,
            "show-match" => Command::ShowMatch(parse_id(rest, "show-match")?),
            "delete-resume" => Command::DeleteResume(parse_id(rest, "delete-resume")?),
            "delete-match" => Command::DeleteMatch(parse_id(rest, "delete-match")?),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn required<'a>(
    rest: &'a str,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, argument })
    } else {
        Ok(rest)
    }
}

fn parse_id(rest: &str, command: &'static str) -> Result<i64, CommandError> {
    let raw = required(rest, command, "an id")?;
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| CommandError::InvalidId(raw.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// The application shell: owns the shared state and every page.
pub struct Shell {
    state: AppState,
    feed: Arc<dyn ChangeFeed>,
    current: Navigation,
    dashboard: Arc<Dashboard>,
    live_dashboard: Option<MountedDashboard>,
    selection: watch::Receiver<Option<ResumeDetail>>,
    upload: UploadPage,
    matcher: MatchPage,
    resumes: ResumeList,
    matches: MatchList,
    match_detail: MatchDetailPage,
}

impl Shell {
    pub fn new(state: AppState, feed: Arc<dyn ChangeFeed>) -> Self {
        Self {
            dashboard: Dashboard::new(state.clone()),
            upload: UploadPage::new(state.clone()),
            matcher: MatchPage::new(state.clone()),
            resumes: ListPage::new(state.clone()),
            matches: ListPage::new(state.clone()),
            match_detail: MatchDetailPage::new(state.clone()),
            live_dashboard: None,
            selection: state.selection.watch(),
            current: Navigation::Upload,
            feed,
            state,
        }
    }

    pub fn current(&self) -> Navigation {
        self.current
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Reads commands until `quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(out, "Resumatch console. Type 'help' for commands.")?;
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            match Command::parse(&line) {
                Ok(Some(command)) => {
                    if self.execute(command, out).await? == Flow::Quit {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => writeln!(out, "{err}")?,
            }
            self.announce_selection(out)?;
            self.flush_notices(out)?;
        }
        self.leave_dashboard().await;
        Ok(())
    }

    pub async fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<Flow> {
        debug!(?command, "Executing command");
        match command {
            Command::Dashboard => self.navigate(Navigation::Dashboard, out).await?,
            Command::Resumes(query) => {
                self.resumes.set_search(query);
                self.navigate(Navigation::Resumes, out).await?;
            }
            Command::Matches(query) => {
                self.matches.set_search(query);
                self.navigate(Navigation::Matches, out).await?;
            }
            Command::Upload(path) => self.upload_file(&path, out).await?,
            Command::Select(id) => {
                if self.matcher.select_resume(id).await.is_ok() {
                    self.navigate(Navigation::Match, out).await?;
                }
            }
            Command::JobDescription(text) => {
                let length = text.trim().chars().count();
                self.matcher.set_job_description(text);
                writeln!(out, "Job description set ({length} / {MAX_JD_CHARS} characters).")?;
            }
            Command::Match => {
                if self.matcher.submit_match().await.is_ok() {
                    self.switch_to(Navigation::Match).await;
                    self.render_match(out)?;
                }
            }
            Command::Analyze => {
                if self.matcher.run_analysis().await.is_ok() {
                    self.render_analysis(out)?;
                }
            }
            Command::ShowMatch(id) => self.navigate(Navigation::MatchDetail(id), out).await?,
            Command::DeleteResume(id) => {
                if self.resumes.delete(id).await.is_ok() && self.state.selection.id() == Some(id) {
                    self.state.selection.set(None);
                }
            }
            Command::DeleteMatch(id) => {
                let open_here = matches!(
                    self.match_detail.status(),
                    DetailStatus::Loaded(ref detail) if detail.summary.id == id
                );
                if open_here {
                    if let Ok(redirect) = self.match_detail.delete().await {
                        self.follow(redirect, out).await?;
                    }
                } else {
                    let _ = self.matches.delete(id).await;
                }
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    async fn upload_file<W: Write>(&mut self, path: &str, out: &mut W) -> Result<()> {
        let file = match FileCandidate::from_path(path).await {
            Ok(file) => file,
            Err(err) => {
                self.state.notifier.validation(err.to_string());
                return Ok(());
            }
        };
        let summary = format!("{} ({})", file.filename(), format_bytes(file.size()));
        if self.upload.accept_file(file).is_err() {
            return Ok(());
        }
        writeln!(out, "Uploading {summary}...")?;
        if let Ok(redirect) = self.upload.confirm().await {
            self.flush_notices(out)?;
            self.follow(redirect, out).await?;
        }
        Ok(())
    }

    async fn follow<W: Write>(&mut self, redirect: Redirect, out: &mut W) -> Result<()> {
        if !redirect.after.is_zero() {
            tokio::time::sleep(redirect.after).await;
        }
        self.navigate(redirect.to, out).await
    }

    /// Leaving the dashboard releases its realtime subscription.
    async fn switch_to(&mut self, to: Navigation) {
        if self.current == Navigation::Dashboard && to != Navigation::Dashboard {
            self.leave_dashboard().await;
        }
        self.current = to;
    }

    async fn navigate<W: Write>(&mut self, to: Navigation, out: &mut W) -> Result<()> {
        self.switch_to(to).await;

        match to {
            Navigation::Dashboard => {
                if !self.live_dashboard.as_ref().is_some_and(MountedDashboard::is_live) {
                    // A feed that gave up is replaced by a fresh subscription.
                    self.leave_dashboard().await;
                    match self.dashboard.mount(self.feed.as_ref()).await {
                        Ok(mounted) => self.live_dashboard = Some(mounted),
                        Err(err) => {
                            self.state
                                .notifier
                                .warning(format!("Live updates unavailable: {err}"));
                            if let Err(err) = self.dashboard.fetch().await {
                                debug!("Dashboard fetch failed: {err}");
                            }
                        }
                    }
                }
                self.render_dashboard(out)?;
            }
            Navigation::Upload => writeln!(out, "Use 'upload <path>' to add a resume.")?,
            Navigation::Match => {
                self.matcher.mount().await;
                self.render_match(out)?;
            }
            Navigation::Matches => {
                let _ = self.matches.mount().await;
                render_list(&self.matches, out, |m| {
                    format!(
                        "#{:<5} {:>5.1}%  {}  {}",
                        m.id,
                        m.match_score,
                        m.resume_filename.as_deref().unwrap_or("-"),
                        truncate(&m.jd_text, 60)
                    )
                })?;
            }
            Navigation::Resumes => {
                let _ = self.resumes.mount().await;
                render_list(&self.resumes, out, |r| {
                    format!("#{:<5} {}  [{}]", r.id, r.filename, r.skills.join(", "))
                })?;
            }
            Navigation::MatchDetail(id) => {
                if self.match_detail.load(id).await.is_ok() {
                    self.render_match_detail(out)?;
                } else if let DetailStatus::Error(message) = self.match_detail.status() {
                    writeln!(out, "{message}")?;
                }
            }
        }
        Ok(())
    }

    async fn leave_dashboard(&mut self) {
        if let Some(mounted) = self.live_dashboard.take() {
            mounted.unmount().await;
        }
    }

    /// Echoes the current resume whenever a command changed it.
    fn announce_selection<W: Write>(&mut self, out: &mut W) -> Result<()> {
        if !self.selection.has_changed().unwrap_or(false) {
            return Ok(());
        }
        match self.selection.borrow_and_update().as_ref() {
            Some(resume) => writeln!(out, "Current resume: #{} {}", resume.id, resume.filename)?,
            None => writeln!(out, "Current resume cleared.")?,
        }
        Ok(())
    }

    fn flush_notices<W: Write>(&self, out: &mut W) -> Result<()> {
        for notice in self.state.notifier.drain() {
            writeln!(out, "[{}] {}", notice.level, notice.message)?;
        }
        Ok(())
    }

    fn render_dashboard<W: Write>(&self, out: &mut W) -> Result<()> {
        let view = self.dashboard.view();
        match &view.stats {
            Some(stats) => writeln!(
                out,
                "Resumes: {}  Matches: {}  Avg score: {:.1}  Success rate: {:.1}%",
                stats.total_resumes, stats.total_matches, stats.avg_score, stats.success_rate
            )?,
            None => writeln!(out, "Stats unavailable.")?,
        }
        if view.recent.is_empty() {
            writeln!(out, "No resumes uploaded yet.")?;
        }
        for resume in &view.recent {
            writeln!(out, "  #{:<5} {}", resume.id, resume.filename)?;
        }
        Ok(())
    }

    fn render_match<W: Write>(&self, out: &mut W) -> Result<()> {
        let view = self.matcher.view();
        match &view.selected {
            Some(resume) => {
                let (shown, hidden) = resume.skill_preview(4);
                let more = if hidden > 0 {
                    format!(" +{hidden}")
                } else {
                    String::new()
                };
                writeln!(
                    out,
                    "Selected: #{} {} [{}{more}]",
                    resume.id,
                    resume.filename,
                    shown.join(", ")
                )?;
            }
            None => writeln!(out, "No resume selected. Use 'select <id>' or 'upload <path>'.")?,
        }
        if !view.resumes.is_empty() {
            let ids: Vec<String> = view
                .resumes
                .iter()
                .map(|r| format!("#{} {}", r.id, r.filename))
                .collect();
            writeln!(out, "Available: {}", ids.join(", "))?;
        }

        match &view.status {
            MatchStatus::Matched(outcome) => {
                let score = outcome.response.match_score;
                writeln!(out, "Score: {score:.1} ({})", ScoreBand::from_score(score).label())?;
                writeln!(out, "Matched skills: {}", outcome.matched_skills.join(", "))?;
                writeln!(
                    out,
                    "Missing skills: {}",
                    outcome.response.missing_skills.join(", ")
                )?;
            }
            MatchStatus::Error(message) => writeln!(out, "Error: {message}")?,
            MatchStatus::Matching => writeln!(out, "Analyzing...")?,
            MatchStatus::Idle => {}
        }
        Ok(())
    }

    fn render_analysis<W: Write>(&self, out: &mut W) -> Result<()> {
        let AnalysisStatus::Analyzed(result) = self.matcher.view().analysis else {
            return Ok(());
        };
        if !result.summary.is_empty() {
            writeln!(out, "{}", result.summary)?;
        }
        writeln!(out, "Coaching score: {}", result.score)?;
        if let Some(pct) = result.match_percentage {
            writeln!(out, "Match: {pct}%")?;
        }
        for (title, items) in [
            ("Strengths", &result.strengths),
            ("Weaknesses", &result.weaknesses),
            ("Suggestions", &result.suggestions),
            ("Keywords to add", &result.keywords_to_add),
        ] {
            if items.is_empty() {
                continue;
            }
            writeln!(out, "{title}:")?;
            for item in items {
                writeln!(out, "  - {item}")?;
            }
        }
        Ok(())
    }

    fn render_match_detail<W: Write>(&self, out: &mut W) -> Result<()> {
        let DetailStatus::Loaded(detail) = self.match_detail.status() else {
            return Ok(());
        };
        let m = &detail.summary;
        writeln!(
            out,
            "Match #{}: {:.1} ({})",
            m.id,
            m.match_score,
            ScoreBand::from_score(m.match_score).label()
        )?;
        if let Some(filename) = &m.resume_filename {
            writeln!(out, "Resume: {filename}")?;
        }
        writeln!(out, "Job description: {}", truncate(&m.jd_text, 200))?;
        writeln!(out, "Matched skills: {}", detail.matched_skills().join(", "))?;
        writeln!(out, "Missing skills: {}", m.missing_skills.join(", "))?;
        if !detail.resume_skills.is_empty() {
            writeln!(out, "Resume skills: {}", detail.resume_skills.join(", "))?;
        }
        Ok(())
    }
}

fn render_list<T, W, F>(page: &ListPage<T>, out: &mut W, row: F) -> Result<()>
where
    T: ListItem,
    W: Write,
    F: Fn(&T) -> String,
{
    let view = page.view();
    if let Some(error) = &view.error {
        writeln!(out, "{error}")?;
        return Ok(());
    }
    if view.items.is_empty() {
        if view.search.is_empty() {
            writeln!(out, "Nothing here yet.")?;
        } else {
            writeln!(out, "No {} match '{}'.", T::PLURAL, view.search)?;
        }
        return Ok(());
    }
    for item in &view.items {
        writeln!(out, "{}", row(item))?;
    }
    writeln!(out, "{} of {} shown", view.items.len(), view.total)?;
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let mut cut: String = flat.chars().take(max).collect();
        cut.push('…');
        cut
    }
}
