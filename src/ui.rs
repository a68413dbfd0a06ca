use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use merit_scholarship::{RankEntry, RunReport, ScholarshipAssignment, StudentRecord};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::collections::HashMap;
use std::io;

const PAGE_STEP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Rankings,
    Allocations,
    Assignments,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Rankings => Page::Allocations,
            Page::Allocations => Page::Assignments,
            Page::Assignments => Page::Rankings,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Rankings => Page::Assignments,
            Page::Allocations => Page::Rankings,
            Page::Assignments => Page::Allocations,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Rankings => "Rankings",
            Page::Allocations => "Allocations",
            Page::Assignments => "Assignments",
        }
    }
}

pub struct App {
    pub report: RunReport,
    pub rankings: Vec<RankEntry>,
    pub assignments: Vec<ScholarshipAssignment>,
    pub colleges: Vec<String>,
    pub college_filter: Option<String>,
    pub current_page: Page,
    pub rankings_state: TableState,
    pub allocations_state: TableState,
    pub assignments_state: TableState,
    pub show_detail: bool,
    records: HashMap<String, StudentRecord>,
    awards: HashMap<String, (String, u64)>,
}

impl App {
    pub fn new(report: RunReport) -> Self {
        let colleges = report
            .allocation
            .colleges
            .iter()
            .map(|c| c.college.clone())
            .collect();

        let records = report
            .partition
            .eligible
            .iter()
            .map(|r| (r.id.clone(), r.clone()))
            .collect();

        let awards = report
            .assignments
            .iter()
            .map(|a| (a.student_id.clone(), (a.tier.clone(), a.amount)))
            .collect();

        let mut app = Self {
            report,
            rankings: Vec::new(),
            assignments: Vec::new(),
            colleges,
            college_filter: None,
            current_page: Page::Rankings,
            rankings_state: TableState::default(),
            allocations_state: TableState::default(),
            assignments_state: TableState::default(),
            show_detail: false,
            records,
            awards,
        };
        app.apply_filter(None);
        if !app.report.allocation.colleges.is_empty() {
            app.allocations_state.select(Some(0));
        }
        app
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    /// Restrict Rankings and Assignments to one college; `None` shows all
    pub fn apply_filter(&mut self, college: Option<String>) {
        let keep = |c: &str| college.as_deref().map_or(true, |f| f == c);

        self.rankings = self
            .report
            .ranking
            .entries()
            .filter(|e| keep(&e.group_key.college))
            .cloned()
            .collect();
        self.assignments = self
            .report
            .assignments
            .iter()
            .filter(|a| keep(&a.group_key.college))
            .cloned()
            .collect();
        self.college_filter = college;

        let first = |len: usize| if len == 0 { None } else { Some(0) };
        self.rankings_state.select(first(self.rankings.len()));
        self.assignments_state.select(first(self.assignments.len()));
    }

    /// All → first college → … → last college → All
    pub fn cycle_college_filter(&mut self) {
        let next = match &self.college_filter {
            None => self.colleges.first().cloned(),
            Some(current) => self
                .colleges
                .iter()
                .position(|c| c == current)
                .and_then(|i| self.colleges.get(i + 1))
                .cloned(),
        };
        self.apply_filter(next);
    }

    pub fn clear_filter(&mut self) {
        self.apply_filter(None);
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn current_len(&self) -> usize {
        match self.current_page {
            Page::Rankings => self.rankings.len(),
            Page::Allocations => self.report.allocation.colleges.len(),
            Page::Assignments => self.assignments.len(),
        }
    }

    fn current_state(&mut self) -> &mut TableState {
        match self.current_page {
            Page::Rankings => &mut self.rankings_state,
            Page::Allocations => &mut self.allocations_state,
            Page::Assignments => &mut self.assignments_state,
        }
    }

    fn select_with(&mut self, step: impl Fn(usize, usize) -> usize) {
        let len = self.current_len();
        if len == 0 {
            return;
        }
        let state = self.current_state();
        let i = state.selected().map_or(0, |i| step(i, len));
        state.select(Some(i));
    }

    pub fn next(&mut self) {
        self.select_with(|i, len| if i >= len - 1 { 0 } else { i + 1 });
    }

    pub fn previous(&mut self) {
        self.select_with(|i, len| if i == 0 { len - 1 } else { i - 1 });
    }

    pub fn page_down(&mut self) {
        self.select_with(|i, len| (i + PAGE_STEP).min(len - 1));
    }

    pub fn page_up(&mut self) {
        self.select_with(|i, _| i.saturating_sub(PAGE_STEP));
    }

    pub fn home(&mut self) {
        self.select_with(|_, _| 0);
    }

    pub fn end(&mut self) {
        self.select_with(|_, len| len - 1);
    }

    pub fn selected_student(&self) -> Option<&str> {
        match self.current_page {
            Page::Rankings => self
                .rankings_state
                .selected()
                .and_then(|i| self.rankings.get(i))
                .map(|e| e.student_id.as_str()),
            Page::Assignments => self
                .assignments_state
                .selected()
                .and_then(|i| self.assignments.get(i))
                .map(|a| a.student_id.as_str()),
            Page::Allocations => None,
        }
    }

    pub fn award_for(&self, student_id: &str) -> Option<&(String, u64)> {
        self.awards.get(student_id)
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('f') => app.cycle_college_filter(),
                KeyCode::Char('c') => app.clear_filter(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.home(),
                KeyCode::End => app.end(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content = if app.show_detail && app.current_page != Page::Allocations {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);
        render_detail_panel(f, content_chunks[1], app);
        content_chunks[0]
    } else {
        chunks[1]
    };

    match app.current_page {
        Page::Rankings => render_rankings(f, content, app),
        Page::Allocations => render_allocations(f, content, app),
        Page::Assignments => render_assignments(f, content, app),
    }

    render_status_bar(f, chunks[2], app);
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn header_row(names: &[&'static str]) -> Row<'static> {
    Row::new(names.iter().map(|h| Cell::from(*h).style(header_style())))
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn tier_color(index: Option<usize>) -> Color {
    match index {
        Some(0) => Color::Yellow,
        Some(1) => Color::Green,
        Some(2) => Color::Cyan,
        Some(_) => Color::Magenta,
        None => Color::DarkGray,
    }
}

fn tier_index(app: &App, tier: &str) -> Option<usize> {
    app.report.allocation.tiers.iter().position(|t| t.name == tier)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Rankings, Page::Allocations, Page::Assignments];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Eligible: {}", app.report.partition.eligible.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Awarded: {}", app.report.assignments.len()),
        Style::default().fg(Color::Green),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Total: {}", app.report.total_awarded()),
        Style::default().fg(Color::Yellow),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_rankings(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .rankings
        .iter()
        .map(|entry| {
            let award = app.award_for(&entry.student_id);
            let color = tier_color(award.and_then(|(tier, _)| tier_index(app, tier)));

            Row::new(vec![
                Cell::from(truncate(&entry.group_key.college, 16)),
                Cell::from(truncate(&entry.group_key.label(), 22)),
                Cell::from(entry.rank.to_string()),
                Cell::from(entry.student_id.clone()),
                Cell::from(format!("{:.2}", entry.gpa)),
                Cell::from(entry.earned_credits.to_string()),
                Cell::from(entry.major_credits.to_string()),
                Cell::from(award.map(|(tier, _)| tier.clone()).unwrap_or_else(|| "-".into()))
                    .style(Style::default().fg(color)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(18),
            Constraint::Length(24),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["College", "Group", "Rank", "Student", "GPA", "Credits", "Major", "Award"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Rankings by Department-Grade "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.rankings_state);
}

fn render_allocations(f: &mut Frame, area: Rect, app: &mut App) {
    let tiers: Vec<String> = app.report.allocation.tiers.iter().map(|t| t.name.clone()).collect();

    let mut header_cells = vec![
        Cell::from("College").style(header_style()),
        Cell::from("Enrolled").style(header_style()),
        Cell::from("Share").style(header_style()),
        Cell::from("Budget").style(header_style()),
        Cell::from("Remaining").style(header_style()),
    ];
    header_cells.extend(tiers.iter().map(|t| Cell::from(t.clone()).style(header_style())));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .report
        .allocation
        .colleges
        .iter()
        .map(|college| {
            let mut cells = vec![
                Cell::from(truncate(&college.college, 20)),
                Cell::from(college.enrollment_count.to_string()),
                Cell::from(format!("{:.1}%", college.budget_share * 100.0)),
                Cell::from(format!("{:.0}", college.allocated_budget)),
                Cell::from(format!("{:.0}", college.remaining_budget)),
            ];
            cells.extend(tiers.iter().enumerate().map(|(i, t)| {
                Cell::from(college.quota(t).unwrap_or(0).to_string())
                    .style(Style::default().fg(tier_color(Some(i))))
            }));
            Row::new(cells).height(1)
        })
        .collect();

    let mut widths = vec![
        Constraint::Length(22),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Length(14),
    ];
    widths.extend(tiers.iter().map(|_| Constraint::Length(10)));

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(
                    " Allocations - budget {} ",
                    app.report.allocation.total_budget
                )),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.allocations_state);
}

fn render_assignments(f: &mut Frame, area: Rect, app: &mut App) {
    let rows: Vec<Row> = app
        .assignments
        .iter()
        .map(|a| {
            let color = tier_color(tier_index(app, &a.tier));
            Row::new(vec![
                Cell::from(a.student_id.clone()),
                Cell::from(truncate(&a.group_key.college, 16)),
                Cell::from(truncate(&a.group_key.label(), 22)),
                Cell::from(a.rank.to_string()),
                Cell::from(a.tier.clone()).style(Style::default().fg(color)),
                Cell::from(a.amount.to_string()).style(Style::default().fg(color)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(18),
            Constraint::Length(24),
            Constraint::Length(6),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["Student", "College", "Group", "Rank", "Tier", "Amount"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Scholarship Assignments "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.assignments_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (selected, total) = match app.current_page {
        Page::Rankings => (app.rankings_state.selected(), app.rankings.len()),
        Page::Allocations => (
            app.allocations_state.selected(),
            app.report.allocation.colleges.len(),
        ),
        Page::Assignments => (app.assignments_state.selected(), app.assignments.len()),
    };

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected.map(|i| i + 1).unwrap_or(0), total),
        Style::default().fg(Color::Cyan),
    )];

    if let Some(college) = &app.college_filter {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("College: {}", college),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" ("));
        status_spans.push(Span::styled("c", Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(" clear)"));
    }

    if !app.report.warnings.is_empty() {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(
            format!("⚠ {}", app.report.warnings.len()),
            Style::default().fg(Color::Red),
        ));
    }

    for (key, label, color) in [
        ("Enter", " Details | ", Color::Yellow),
        ("Tab", " Page | ", Color::Yellow),
        ("f", " College | ", Color::Yellow),
        ("↑/↓", " Nav | ", Color::Yellow),
        ("PgUp/PgDn", " Fast | ", Color::Yellow),
        ("q", " Quit", Color::Red),
    ] {
        if key == "Enter" {
            status_spans.push(Span::raw(" | "));
        }
        status_spans.push(Span::styled(key, Style::default().fg(color)));
        status_spans.push(Span::raw(label));
    }

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn detail_line<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("  {}: ", label),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw(value),
    ])
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Student Details ");

    let Some(record) = app.selected_student().and_then(|id| app.records.get(id)) else {
        f.render_widget(Paragraph::new("No student selected").block(block), area);
        return;
    };

    let mut content = vec![
        Line::from(""),
        detail_line("Student", record.id.clone()),
        detail_line("Name", record.name.clone()),
        detail_line("College", record.college.clone()),
        detail_line("Department", record.department.clone()),
        detail_line("Grade", record.grade.to_string()),
        detail_line("Status", record.academic_status.to_string()),
        detail_line("Admission", record.admission_category.clone()),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
        detail_line("GPA", format!("{:.2}", record.gpa)),
        detail_line("Credits", record.earned_credits.to_string()),
        detail_line("Major credits", record.major_credits.to_string()),
        Line::from(""),
        Line::from("  ─────────────────────────────────────"),
        Line::from(""),
    ];

    match app.award_for(&record.id) {
        Some((tier, amount)) => {
            let color = tier_color(tier_index(app, tier));
            content.push(Line::from(vec![
                Span::styled(
                    "  AWARD ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                ),
                Span::styled(format!(" {} · {}", tier, amount), Style::default().fg(color)),
            ]));
        }
        None => content.push(Line::from(Span::styled(
            "  No award",
            Style::default().fg(Color::DarkGray),
        ))),
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
