use clap::Parser;
use pallet_stacker::render;
use pallet_stacker::{Engine, MixedPalletResult, PackConfig, PackRequest, PalletSpec, UnitType};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "pallet_stacker",
    about = "Mixed-unit pallet stacking planner"
)]
struct Cli {
    /// Pallet footprint (LxW, e.g. 48x40)
    #[arg(long, required_unless_present = "input")]
    pallet: Option<String>,

    /// Height of the empty pallet deck
    #[arg(long, default_value_t = 0.0)]
    base_height: f64,

    /// Maximum stack height, deck included
    #[arg(long, required_unless_present = "input")]
    max_height: Option<f64>,

    /// Weight of the empty pallet
    #[arg(long, default_value_t = 0.0)]
    pallet_weight: f64,

    /// Unit types as [NAME=]LxWxH[:QTY][@WEIGHT] (e.g. carton=12x10x8:40@2.5)
    #[arg(long = "units", num_args = 1.., required_unless_present = "input")]
    units: Vec<String>,

    /// Packing engine: height-map or layered
    #[arg(long, value_parser = parse_engine)]
    engine: Option<Engine>,

    /// Height-map cell size
    #[arg(long)]
    grid_resolution: Option<f64>,

    /// Read the whole request from a JSON file instead
    #[arg(long, conflicts_with_all = ["pallet", "units"])]
    input: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Show ASCII plan of each layer
    #[arg(long)]
    layout: bool,

    /// Log engine progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_engine(s: &str) -> Result<Engine, String> {
    match s {
        "height-map" => Ok(Engine::HeightMap),
        "layered" => Ok(Engine::Layered),
        _ => Err(format!(
            "invalid engine '{}', expected: height-map or layered",
            s
        )),
    }
}

fn parse_number(s: &str, what: &str, input: &str) -> Result<f64, String> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid {} in '{}'", what, input))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{} must be positive in '{}'", what, input));
    }
    Ok(value)
}

fn parse_pallet(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid pallet '{}', expected LxW", s));
    }
    Ok((
        parse_number(parts[0], "length", s)?,
        parse_number(parts[1], "width", s)?,
    ))
}

fn parse_unit(s: &str, index: usize) -> Result<UnitType, String> {
    let (name, rest) = match s.split_once('=') {
        Some((name, rest)) if !name.trim().is_empty() => (name.trim().to_string(), rest),
        Some(_) => return Err(format!("empty unit name in '{}'", s)),
        None => (format!("Unit {}", index + 1), s),
    };
    let (rest, weight) = match rest.split_once('@') {
        Some((rest, weight)) => {
            let weight = weight
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid weight in '{}'", s))?;
            (rest, weight)
        }
        None => (rest, 0.0),
    };
    let (dims, qty) = match rest.split_once(':') {
        Some((dims, qty)) => {
            let qty = qty
                .trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid quantity in '{}'", s))?;
            (dims, Some(qty))
        }
        None => (rest, None),
    };

    let parts: Vec<&str> = dims.split('x').collect();
    if parts.len() != 3 {
        return Err(format!(
            "invalid unit '{}', expected [NAME=]LxWxH[:QTY][@WEIGHT]",
            s
        ));
    }
    let mut unit = UnitType::new(
        format!("u{}", index + 1),
        name,
        parse_number(parts[0], "length", s)?,
        parse_number(parts[1], "width", s)?,
        parse_number(parts[2], "height", s)?,
    )
    .with_weight(weight);
    unit.quantity = qty;
    Ok(unit)
}

fn build_request(cli: &Cli) -> Result<PackRequest, String> {
    let mut request = match &cli.input {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read '{}': {}", path, e))?;
            serde_json::from_str::<PackRequest>(&text)
                .map_err(|e| format!("invalid request in '{}': {}", path, e))?
        }
        None => {
            let pallet = cli.pallet.as_deref().ok_or("missing --pallet")?;
            let (length, width) = parse_pallet(pallet)?;
            let max_height = cli.max_height.ok_or("missing --max-height")?;
            let units = cli
                .units
                .iter()
                .enumerate()
                .map(|(i, u)| parse_unit(u, i))
                .collect::<Result<Vec<_>, _>>()?;
            PackRequest {
                units,
                pallet: PalletSpec::new(length, width, cli.base_height, max_height)
                    .with_weight(cli.pallet_weight),
                engine: Engine::default(),
                config: PackConfig::default(),
            }
        }
    };

    if let Some(engine) = cli.engine {
        request.engine = engine;
    }
    if let Some(resolution) = cli.grid_resolution {
        request.config.grid_resolution = resolution;
    }
    Ok(request)
}

fn print_result(pallet: &PalletSpec, result: &MixedPalletResult, layout: bool) {
    for layer in &result.layers {
        println!(
            "Layer {} (base {:.2}, {:.2} thick, {:.1}% filled):",
            layer.layer_index + 1,
            layer.base_y,
            layer.height,
            layer.fill_percent(),
        );
        for p in &layer.placements {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!(
                "  {} {} @ ({:.2}, {:.2}, {:.2}){}",
                p.unit_name, p.dimensions, p.position.x, p.position.y, p.position.z, rot
            );
        }
        if layout {
            print!("{}", render::render_layer(pallet, layer));
        }
        println!();
    }

    for s in &result.unit_summaries {
        match s.quantity_requested {
            Some(q) => println!("{}: {} of {} placed", s.unit_name, s.count_placed, q),
            None => println!("{}: {} placed", s.unit_name, s.count_placed),
        }
    }
    for w in &result.warnings {
        eprintln!("Warning: {}", w);
    }

    println!(
        "Summary: {} unit{} in {} layer{}, height {:.2} of {:.2}, \
         {:.1}% area, {:.1}% volume, {:.2} total weight{}",
        result.total_units,
        if result.total_units == 1 { "" } else { "s" },
        result.layers.len(),
        if result.layers.len() == 1 { "" } else { "s" },
        result.total_height,
        pallet.max_height,
        result.area_efficiency,
        result.volume_efficiency,
        result.combined_weight,
        if result.is_valid { "" } else { " (invalid)" },
    );
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let request = build_request(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let pallet = request.pallet;
    let solver = request.into_solver().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    let result = solver.solve();

    if cli.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print_result(&pallet, &result, cli.layout);
    }
}
