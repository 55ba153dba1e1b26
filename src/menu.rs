//! Interactive numeric module menu

use crate::error::{FleetError, FleetResult};
use crate::modules::Module;

use std::io::{BufRead, Write};

pub const MAIN_MENU: &str = "\n1. Apriori Stake\n2. Kintsu\n3. Magic Eden Mint\n4. Owlto Deploy Contract\nSelect module: ";
pub const KINTSU_MENU: &str = "\n1. Stake\n2. Unstake\n3. sMON balance\nSelect action: ";

fn parse_number(input: &str) -> FleetResult<u32> {
    input
        .trim()
        .parse::<u32>()
        .map_err(|_| FleetError::Config(format!("invalid menu choice '{}'", input.trim())))
}

/// Top-level choice. `Ok(None)` means the Kintsu sub-menu must be asked next.
pub fn parse_main(input: &str) -> FleetResult<Option<Module>> {
    match parse_number(input)? {
        1 => Ok(Some(Module::AprioriStake)),
        2 => Ok(None),
        3 => Ok(Some(Module::MagicEdenMint)),
        4 => Ok(Some(Module::OwltoDeploy)),
        other => Err(FleetError::Config(format!("unknown module {}", other))),
    }
}

pub fn parse_kintsu(input: &str) -> FleetResult<Module> {
    match parse_number(input)? {
        1 => Ok(Module::KintsuStake),
        2 => Ok(Module::KintsuUnstake),
        3 => Ok(Module::KintsuBalance),
        other => Err(FleetError::Config(format!("unknown Kintsu action {}", other))),
    }
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, text: &str) -> FleetResult<String> {
    output.write_all(text.as_bytes())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line)
}

/// Ask for a module on `output`, reading answers from `input`
pub fn select_module<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> FleetResult<Module> {
    let choice = prompt(input, output, MAIN_MENU)?;
    match parse_main(&choice)? {
        Some(module) => Ok(module),
        None => parse_kintsu(&prompt(input, output, KINTSU_MENU)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_main_menu_choices() {
        assert_eq!(parse_main("1\n").unwrap(), Some(Module::AprioriStake));
        assert_eq!(parse_main(" 2 ").unwrap(), None);
        assert_eq!(parse_main("3").unwrap(), Some(Module::MagicEdenMint));
        assert_eq!(parse_main("4").unwrap(), Some(Module::OwltoDeploy));
        assert!(parse_main("5").is_err());
        assert!(parse_main("apriori").is_err());
        assert!(parse_main("").is_err());
    }

    #[test]
    fn test_kintsu_sub_menu() {
        let mut input = Cursor::new("2\n2\n");
        let mut output = Vec::new();

        let module = select_module(&mut input, &mut output).unwrap();
        assert_eq!(module, Module::KintsuUnstake);

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("Select module"));
        assert!(shown.contains("Select action"));

        assert_eq!(parse_kintsu("1").unwrap(), Module::KintsuStake);
        assert_eq!(parse_kintsu("3").unwrap(), Module::KintsuBalance);
        assert!(parse_kintsu("0").is_err());
    }

    #[test]
    fn test_single_level_choice_reads_one_line() {
        let mut input = Cursor::new("3\nleftover\n");
        let mut output = Vec::new();
        assert_eq!(
            select_module(&mut input, &mut output).unwrap(),
            Module::MagicEdenMint
        );
        assert!(!String::from_utf8(output).unwrap().contains("Select action"));
    }
}
