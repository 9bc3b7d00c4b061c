//! Plain-text output: GitHub-flavoured tables and number formatting.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

pub struct Table {
    headers: Vec<(&'static str, Align)>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[(&'static str, Align)]) -> Self {
        Self {
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, (header, _))| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| cell.chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: Vec<&str>| -> String {
            let padded: Vec<String> = cells
                .iter()
                .zip(&self.headers)
                .zip(&widths)
                .map(|((cell, (_, align)), width)| match align {
                    Align::Left => format!("{:<width$}", cell, width = width),
                    Align::Right => format!("{:>width$}", cell, width = width),
                })
                .collect();
            format!("| {} |", padded.join(" | "))
        };

        let mut out = Vec::with_capacity(self.rows.len() + 2);
        out.push(line(self.headers.iter().map(|(h, _)| *h).collect()));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
        out.push(format!("|{}|", rule.join("|")));
        for row in &self.rows {
            let cells = (0..self.headers.len())
                .map(|i| row.get(i).map(String::as_str).unwrap_or(""))
                .collect();
            out.push(line(cells));
        }
        out.join("\n")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// `1234567` as `1,234,567`.
pub fn format_count(n: i64) -> String {
    let grouped = group_thousands(&n.unsigned_abs().to_string());
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// `1234.5` as `$1,234.50`.
pub fn format_money(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let body = format!(
        "${}.{:02}",
        group_thousands(&(cents / 100).to_string()),
        cents % 100
    );
    if amount < 0.0 && cents > 0 {
        format!("-{}", body)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(-1234567), "-1,234,567");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0.0), "$0.00");
        assert_eq!(format_money(1234.5), "$1,234.50");
        assert_eq!(format_money(99999.999), "$100,000.00");
        assert_eq!(format_money(-12.5), "-$12.50");
    }

    #[test]
    fn test_render_github_table() {
        let mut table = Table::new(&[("Symbol", Align::Left), ("Quantity", Align::Right)]);
        table.push(vec!["ETSY".into(), "1,200".into()]);
        table.push(vec!["SQ".into(), "7".into()]);
        assert_eq!(
            table.render(),
            "| Symbol | Quantity |\n\
             |--------|----------|\n\
             | ETSY   |    1,200 |\n\
             | SQ     |        7 |"
        );
    }

    #[test]
    fn test_missing_cells_render_blank() {
        let mut table = Table::new(&[("A", Align::Left), ("B", Align::Left)]);
        table.push(vec!["x".into()]);
        assert!(table.render().ends_with("| x |   |"));
    }
}
