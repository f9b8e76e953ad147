use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .literal(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    pub const GOLD: Color = Color::Rgb {
        r: 255,
        g: 196,
        b: 0,
    };
    pub const GREEN: Color = Color::Rgb {
        r: 0,
        g: 200,
        b: 120,
    };
    pub const RED: Color = Color::Rgb {
        r: 255,
        g: 85,
        b: 85,
    };
    pub const ORANGE: Color = Color::Rgb {
        r: 255,
        g: 165,
        b: 0,
    };
    pub const DIM: Color = Color::Rgb {
        r: 128,
        g: 128,
        b: 128,
    };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
}

mod box_chars {
    pub const SINGLE_HORIZONTAL: &str = "─";
    pub const SINGLE_VERTICAL: &str = "│";
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";
    pub const BULLET: &str = "●";
    pub const BULLET_EMPTY: &str = "○";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status Lines
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    eprintln!(
        " {} {}",
        box_chars::CROSS_MARK.with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    eprintln!(
        " {} {}",
        "⚠".with(colors::ORANGE).bold(),
        message.with(colors::ORANGE)
    );
}

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::GOLD),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        box_chars::BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

pub fn print_section_header(title: &str) {
    println!();
    println!("{}", title.with(colors::GOLD).bold().attribute(Attribute::Underlined));
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table Display
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: &[&str]) -> Self {
        TableBuilder {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
            col_widths: headers.iter().map(|h| h.width()).collect(),
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (width, cell) in self.col_widths.iter_mut().zip(&row) {
            *width = (*width).max(cell.width());
        }
        self.rows.push(row);
    }

    fn print_border(&self, left: &str, junction: &str, right: &str) {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|width| box_chars::SINGLE_HORIZONTAL.repeat(width + 2))
            .collect();
        println!(
            "{}",
            format!("{}{}{}", left, segments.join(junction), right).with(colors::GOLD)
        );
    }

    fn print_cells(&self, cells: &[String], header: bool) {
        print!("{}", box_chars::SINGLE_VERTICAL.with(colors::GOLD));
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = " ".repeat(width.saturating_sub(cell.width()));
            if header {
                print!(" {}{} ", cell.with(colors::GOLD).bold(), padding);
            } else {
                print!(" {}{} ", cell.with(colors::WHITE), padding);
            }
            print!("{}", box_chars::SINGLE_VERTICAL.with(colors::GOLD));
        }
        println!();
    }

    pub fn print(&self) {
        self.print_border(
            box_chars::ROUND_TOP_LEFT,
            box_chars::T_TOP,
            box_chars::ROUND_TOP_RIGHT,
        );
        self.print_cells(&self.headers, true);
        self.print_border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);
        for row in &self.rows {
            self.print_cells(row, false);
        }
        self.print_border(
            box_chars::ROUND_BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::ROUND_BOTTOM_RIGHT,
        );
    }
}
