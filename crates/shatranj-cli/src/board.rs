//! Plain-text board rendering.

use chess_game::Color;

/// Draw the piece placement of `fen` with `orientation` at the bottom.
pub fn render(fen: &str, orientation: Color) -> String {
    let placement = fen.split_whitespace().next().unwrap_or_default();

    let mut ranks: Vec<Vec<char>> = placement
        .split('/')
        .map(|row| {
            row.chars()
                .flat_map(|ch| match ch.to_digit(10) {
                    Some(n) => vec!['.'; n as usize],
                    None => vec![ch],
                })
                .collect()
        })
        .collect();
    let mut files: Vec<char> = ('a'..='h').collect();
    let mut numbers: Vec<u32> = (1..=8).rev().collect();

    if orientation == Color::Black {
        ranks.reverse();
        ranks.iter_mut().for_each(|rank| rank.reverse());
        files.reverse();
        numbers.reverse();
    }

    let mut out = String::new();
    for (rank, number) in ranks.iter().zip(&numbers) {
        let squares: Vec<String> = rank.iter().map(char::to_string).collect();
        out.push_str(&format!("{} {}\n", number, squares.join(" ")));
    }
    let labels: Vec<String> = files.iter().map(char::to_string).collect();
    out.push_str(&format!("  {}", labels.join(" ")));
    out
}
