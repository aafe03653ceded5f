use std::path::PathBuf;

use chrono::Duration;
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table, Tabs,
    },
    Frame,
};
use rusqlite::Connection;

use crate::chart::{series, ChartKind, ChartSpec};
use crate::cli::export::{save_csv, save_pdf};
use crate::cli::{FilterArgs, Session};
use crate::error::Result;
use crate::fmt::money;
use crate::models::{CategoryCatalog, FilterContext};
use crate::reports::{run_report, Report, ReportOutput};
use crate::settings::resolve_exports_dir;
use crate::table::TabularResult;
use crate::tui::{
    run_screen, Screen, ScreenAction, CHART_STYLE, ERROR_STYLE, FOOTER_STYLE, HEADER_STYLE,
    SELECTED_STYLE, STATUS_STYLE,
};

const SIDEBAR_WIDTH: u16 = 28;

/// Step applied to the max amount filter by one arrow key press.
const AMOUNT_STEP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    DateStart,
    DateEnd,
    MaxAmount,
    Status,
    Category,
}

impl Field {
    const ALL: [Field; 5] = [
        Field::DateStart,
        Field::DateEnd,
        Field::MaxAmount,
        Field::Status,
        Field::Category,
    ];

    fn label(&self) -> &'static str {
        match self {
            Field::DateStart => "Fecha inicio",
            Field::DateEnd => "Fecha fin",
            Field::MaxAmount => "Monto máximo",
            Field::Status => "Estado",
            Field::Category => "Categoría",
        }
    }

    /// Whether `report` reads this field; the others are dimmed while its tab is shown.
    fn used_by(&self, report: Report) -> bool {
        match report {
            Report::Orders => *self != Field::Category,
            Report::DailySales | Report::PaymentMethods => {
                matches!(self, Field::DateStart | Field::DateEnd)
            }
            Report::TopProducts => !matches!(self, Field::MaxAmount | Field::Status),
            Report::OpenOrders => false,
        }
    }
}

/// A new filter context with `field` moved `step` positions: dates by days, the amount by
/// `AMOUNT_STEP` (never below zero), status and category cycling through their choices.
pub(crate) fn adjust(
    filters: &FilterContext,
    field: Field,
    step: i32,
    catalog: &CategoryCatalog,
) -> FilterContext {
    let mut next = filters.clone();
    match field {
        Field::DateStart => next.date_start = filters.date_start + Duration::days(step as i64),
        Field::DateEnd => next.date_end = filters.date_end + Duration::days(step as i64),
        Field::MaxAmount => {
            next.max_amount = (filters.max_amount + AMOUNT_STEP * step as f64).max(0.0)
        }
        Field::Status => next.status = filters.status.cycle(step),
        Field::Category => next.category = catalog.cycle(filters.category, step),
    }
    next
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Table,
    Filters,
}

struct Dashboard<'a> {
    conn: &'a Connection,
    catalog: CategoryCatalog,
    exports_dir: PathBuf,
    title: String,
    filters: FilterContext,
    tab: Report,
    output: Option<ReportOutput>,
    error: Option<String>,
    focus: Focus,
    field: usize,
    offset: usize,
    visible_rows: usize,
    status_message: Option<String>,
}

impl<'a> Dashboard<'a> {
    fn new(
        conn: &'a Connection,
        catalog: CategoryCatalog,
        filters: FilterContext,
        exports_dir: PathBuf,
        title: String,
    ) -> Self {
        let mut dashboard = Self {
            conn,
            catalog,
            exports_dir,
            title,
            filters,
            tab: Report::Orders,
            output: None,
            error: None,
            focus: Focus::Table,
            field: 0,
            offset: 0,
            visible_rows: 10,
            status_message: None,
        };
        dashboard.reload();
        dashboard
    }

    /// Re-run the visible tab's query with the current filters.
    fn reload(&mut self) {
        self.offset = 0;
        match run_report(self.conn, self.tab, &self.filters) {
            Ok(out) => {
                self.output = Some(out);
                self.error = None;
            }
            Err(e) => {
                log::warn!("{} failed: {e}", self.tab);
                self.output = None;
                self.error = Some(e.to_string());
            }
        }
    }

    fn select_tab(&mut self, report: Report) {
        if report != self.tab {
            self.tab = report;
            self.reload();
        }
    }

    fn apply_filters(&mut self, next: FilterContext) {
        if next != self.filters {
            self.filters = next;
            self.reload();
        }
    }

    fn row_count(&self) -> usize {
        self.output.as_ref().map(|o| o.table.len()).unwrap_or(0)
    }

    fn scroll(&mut self, delta: isize) {
        let max_offset = self.row_count().saturating_sub(self.visible_rows);
        self.offset = (self.offset as isize + delta).clamp(0, max_offset as isize) as usize;
    }

    fn field_value(&self, field: Field) -> String {
        match field {
            Field::DateStart => self.filters.date_start.format("%Y-%m-%d").to_string(),
            Field::DateEnd => self.filters.date_end.format("%Y-%m-%d").to_string(),
            Field::MaxAmount => money(self.filters.max_amount),
            Field::Status => self.filters.status.to_string(),
            Field::Category => self.catalog.label(self.filters.category),
        }
    }

    fn export_csv(&mut self) {
        let message = match &self.output {
            None => "Nothing to export".to_string(),
            Some(out) => match save_csv(out, &self.exports_dir) {
                Ok(path) => format!("Wrote {}", path.display()),
                Err(e) => format!("CSV export failed: {e}"),
            },
        };
        self.status_message = Some(message);
    }

    fn export_pdf(&mut self) {
        let message = match &self.output {
            None => "Nothing to export".to_string(),
            Some(out) => match save_pdf(out, &self.exports_dir) {
                Ok(Some(path)) => format!("Wrote {}", path.display()),
                Ok(None) => format!("{}: no rows, PDF not available", self.tab.title()),
                Err(e) => format!("PDF export failed: {e}"),
            },
        };
        self.status_message = Some(message);
    }

    fn handle_filter_key(&mut self, code: KeyCode) {
        let len = Field::ALL.len();
        match code {
            KeyCode::Up => self.field = (self.field + len - 1) % len,
            KeyCode::Down => self.field = (self.field + 1) % len,
            KeyCode::Left | KeyCode::Right => {
                let step = if code == KeyCode::Left { -1 } else { 1 };
                let next = adjust(&self.filters, Field::ALL[self.field], step, &self.catalog);
                self.apply_filters(next);
            }
            KeyCode::Enter => self.focus = Focus::Table,
            _ => {}
        }
    }

    fn handle_table_key(&mut self, code: KeyCode) {
        let page = self.visible_rows.max(1) as isize;
        match code {
            KeyCode::Down => self.scroll(1),
            KeyCode::Up => self.scroll(-1),
            KeyCode::PageDown => self.scroll(page),
            KeyCode::PageUp => self.scroll(-page),
            KeyCode::Home => self.offset = 0,
            KeyCode::End => self.scroll(isize::MAX / 2),
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw_filters(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Filters;
        let block = Block::default()
            .title(" Filtros ")
            .borders(Borders::ALL)
            .border_style(if focused { HEADER_STYLE } else { FOOTER_STYLE });

        let mut lines = Vec::new();
        for (i, field) in Field::ALL.iter().enumerate() {
            let used = field.used_by(self.tab);
            let value_style = if focused && i == self.field {
                SELECTED_STYLE
            } else if used {
                Style::default()
            } else {
                FOOTER_STYLE
            };
            lines.push(Line::from(Span::styled(format!(" {}", field.label()), FOOTER_STYLE)));
            lines.push(Line::from(Span::styled(
                format!("  {}", self.field_value(*field)),
                value_style,
            )));
            lines.push(Line::from(""));
        }
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_report(&mut self, frame: &mut Frame, area: Rect) {
        let chart = self
            .tab
            .chart()
            .filter(|_| self.output.as_ref().is_some_and(|o| !o.table.is_empty()));
        let chart_height = if chart.is_some() { (area.height / 2).min(16) } else { 0 };

        let [desc_area, table_area, chart_area] = Layout::vertical([
            Constraint::Length(2),
            Constraint::Fill(1),
            Constraint::Length(chart_height),
        ])
        .areas(area);

        let desc = format!(
            " {}  ({} rows)",
            self.tab.describe_filters(&self.filters, &self.catalog),
            self.row_count()
        );
        frame.render_widget(Paragraph::new(desc).style(FOOTER_STYLE), desc_area);

        if let Some(err) = &self.error {
            frame.render_widget(
                Paragraph::new(format!(" Error: {err}")).style(ERROR_STYLE),
                table_area,
            );
            return;
        }

        // Header row plus its bottom margin.
        self.visible_rows = (table_area.height.saturating_sub(2) as usize).max(1);

        let Some(out) = &self.output else {
            return;
        };
        if out.table.is_empty() {
            frame.render_widget(Paragraph::new(" Sin resultados.").style(STATUS_STYLE), table_area);
        } else {
            frame.render_widget(result_table(&out.table, self.offset, self.visible_rows), table_area);
        }

        if let Some(spec) = chart {
            draw_chart(frame, chart_area, &spec, &out.table);
        }
    }
}

fn result_table(table: &TabularResult, offset: usize, visible: usize) -> Table<'static> {
    let header = Row::new(table.columns().iter().map(|c| Cell::from(c.clone())))
        .style(HEADER_STYLE)
        .bottom_margin(1);
    let rows: Vec<Row> = table
        .display_rows()
        .skip(offset)
        .take(visible)
        .map(Row::new)
        .collect();
    let widths = vec![Constraint::Fill(1); table.columns().len()];
    Table::new(rows, widths).header(header).column_spacing(1)
}

fn draw_chart(frame: &mut Frame, area: Rect, spec: &ChartSpec, table: &TabularResult) {
    let Ok(points) = series(table, spec) else {
        return;
    };
    let top = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max).max(1.0);

    match spec.kind {
        ChartKind::Line => {
            let data: Vec<(f64, f64)> = points
                .iter()
                .enumerate()
                .map(|(i, (_, v))| (i as f64, *v))
                .collect();
            let first = points.first().map(|(l, _)| l.clone()).unwrap_or_default();
            let last = points.last().map(|(l, _)| l.clone()).unwrap_or_default();
            let dataset = Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(CHART_STYLE)
                .data(&data);
            let chart = Chart::new(vec![dataset])
                .block(Block::default().title(spec.title.unwrap_or("")))
                .x_axis(
                    Axis::default()
                        .title(spec.x_label)
                        .style(FOOTER_STYLE)
                        .bounds([0.0, (data.len().max(2) - 1) as f64])
                        .labels(vec![Span::raw(first), Span::raw(last)]),
                )
                .y_axis(
                    Axis::default()
                        .title(spec.y_label)
                        .style(FOOTER_STYLE)
                        .bounds([0.0, top * 1.1])
                        .labels(vec![Span::raw("0"), Span::raw(format!("{top:.0}"))]),
                );
            frame.render_widget(chart, area);
        }
        ChartKind::Bar | ChartKind::HorizontalBar => {
            let bars: Vec<Bar> = points
                .iter()
                .map(|(label, v)| {
                    Bar::default()
                        .value(v.max(0.0).round() as u64)
                        .label(Line::from(label.clone()))
                        .text_value(format!("{v:.0}"))
                })
                .collect();
            let chart = BarChart::default()
                .block(Block::default().title(spec.x_label))
                .data(BarGroup::default().bars(&bars))
                .bar_style(CHART_STYLE);
            let chart = if spec.kind == ChartKind::HorizontalBar {
                chart.direction(Direction::Horizontal).bar_width(1).bar_gap(0)
            } else {
                chart.bar_width(12).bar_gap(2)
            };
            frame.render_widget(chart, area);
        }
    }
}

impl Screen for Dashboard<'_> {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, tabs_area, body_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(format!(" {}", self.title)).style(HEADER_STYLE),
            header_area,
        );

        let titles: Vec<String> = Report::ALL
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{} {}", i + 1, r.tab_label()))
            .collect();
        frame.render_widget(
            Tabs::new(titles)
                .select(self.tab.position())
                .highlight_style(SELECTED_STYLE)
                .divider("|"),
            tabs_area,
        );

        let [sidebar, main] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
                .areas(body_area);
        self.draw_filters(frame, sidebar);
        self.draw_report(frame, main);

        let hints = if let Some(msg) = &self.status_message {
            Paragraph::new(format!(" {msg}")).style(STATUS_STYLE)
        } else if self.focus == Focus::Filters {
            Paragraph::new(" Up/Down=field  Left/Right=change  Enter/f=table  c=CSV  p=PDF  q=quit")
                .style(FOOTER_STYLE)
        } else {
            Paragraph::new(" 1-5/Tab=report  f=filters  Up/Down/PgUp/PgDn=scroll  c=CSV  p=PDF  q=quit")
                .style(FOOTER_STYLE)
        };
        frame.render_widget(hints, hints_area);
    }

    fn handle_key(&mut self, code: KeyCode) -> ScreenAction {
        self.status_message = None;
        let tabs = Report::ALL.len();
        match code {
            KeyCode::Char('q') => return ScreenAction::Close,
            KeyCode::Esc => {
                if self.focus == Focus::Filters {
                    self.focus = Focus::Table;
                } else {
                    return ScreenAction::Close;
                }
            }
            KeyCode::Char(c @ '1'..='5') => {
                self.select_tab(Report::ALL[(c as u8 - b'1') as usize]);
            }
            KeyCode::Tab => self.select_tab(Report::ALL[(self.tab.position() + 1) % tabs]),
            KeyCode::BackTab => {
                self.select_tab(Report::ALL[(self.tab.position() + tabs - 1) % tabs])
            }
            KeyCode::Char('f') => {
                self.focus = match self.focus {
                    Focus::Table => Focus::Filters,
                    Focus::Filters => Focus::Table,
                };
            }
            KeyCode::Char('c') => self.export_csv(),
            KeyCode::Char('p') => self.export_pdf(),
            _ => match self.focus {
                Focus::Filters => self.handle_filter_key(code),
                Focus::Table => self.handle_table_key(code),
            },
        }
        ScreenAction::Continue
    }
}

pub fn run(db: Option<&str>, filters: &FilterArgs) -> Result<()> {
    let Session {
        conn,
        catalog,
        settings,
    } = Session::open(db)?;
    let ctx = filters.to_context(&catalog, &settings)?;
    let title = if settings.cafeteria_name.is_empty() {
        "Cafetería: reportes".to_string()
    } else {
        format!("{}: reportes", settings.cafeteria_name)
    };

    let mut dashboard = Dashboard::new(&conn, catalog, ctx, resolve_exports_dir(db), title);
    run_screen(&mut dashboard)
}
