use prettytable::{Row, Table, format};

use crate::model::Command;

/// Renders a set of commands as a table, one row per command
pub fn commands_table(commands: &[Command]) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::from(vec!["Name", "Kind", "Category", "Description", "File"]));
    for command in commands {
        table.add_row(Row::from(vec![
            command.name.clone(),
            command.kind.to_string(),
            command.category.clone(),
            command.description.clone().unwrap_or_default(),
            command.source_path.clone(),
        ]));
    }
    table
}

/// Renders everything known about a single command as a two-column grid
pub fn command_details(command: &Command) -> Table {
    let mut grid = Table::new();
    grid.set_format(*format::consts::FORMAT_CLEAN);
    grid.add_row(Row::from(vec![String::from("Command:"), command.name.clone()]));
    grid.add_row(Row::from(vec![String::from("Type:"), command.kind.to_string()]));
    grid.add_row(Row::from(vec![
        String::from("Description:"),
        command.description.clone().unwrap_or_default(),
    ]));
    grid.add_row(Row::from(vec![String::from("Category:"), command.category.clone()]));
    grid.add_row(Row::from(vec![String::from("File:"), command.source_path.clone()]));
    if command.hidden {
        grid.add_row(Row::from(vec![String::from("Hidden:"), String::from("yes")]));
    }
    if command.orphaned_at.is_some() {
        grid.add_row(Row::from(vec![
            String::from("Orphaned:"),
            String::from("no longer found on the indexed files"),
        ]));
    }
    grid.add_row(Row::from(vec![String::from("Code:"), command.code.clone()]));
    grid
}
