use anyhow::Context;
use clap::Parser;
use parcel_locker::core::desk::RegistrationRequest;
use parcel_locker::domain::model::{Contact, LocationId, Service};
use parcel_locker::utils::error::{ErrorSeverity, LockerError};
use parcel_locker::utils::logger::{self, LogFormat};
use parcel_locker::utils::validation::Validate;
use parcel_locker::{
    CliConfig, LocalStorage, LockerNetwork, NetworkConfig, NetworkReport, TracingNotifier,
};

fn main() {
    let config = CliConfig::parse();

    logger::init_logger(LogFormat::from_flag(config.json_logs), config.verbose);

    tracing::info!("Starting parcel-locker");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Invalid arguments: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run(&config) {
        let exit_code = match e.downcast_ref::<LockerError>() {
            Some(err) => {
                tracing::error!(
                    "❌ {:#} (Category: {:?}, Severity: {:?})",
                    e,
                    err.category(),
                    err.severity()
                );
                eprintln!("❌ {}", err.user_friendly_message());
                eprintln!("💡 Suggestion: {}", err.recovery_suggestion());
                match err.severity() {
                    ErrorSeverity::Low => 0,
                    ErrorSeverity::Medium => 2,
                    ErrorSeverity::High => 1,
                    ErrorSeverity::Critical => 3,
                }
            }
            None => {
                tracing::error!("❌ {:#}", e);
                eprintln!("❌ {:#}", e);
                1
            }
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

fn run(args: &CliConfig) -> anyhow::Result<()> {
    tracing::info!("📁 Loading configuration from: {}", args.config);
    let config = NetworkConfig::from_file(&args.config)
        .with_context(|| format!("failed to load '{}'", args.config))?;
    config.validate()?;
    tracing::info!("✅ Configuration loaded and validated");

    if args.dry_run {
        print_summary(&config);
        return Ok(());
    }

    let mut network = config.build_network()?;
    let date = args
        .date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    if args.demo {
        run_demo(&config, &mut network)?;
    }

    println!("Availability on {}:", date.format("%Y-%m-%d"));
    for locker in network.lockers() {
        let availability = locker.check_availability(date);
        println!(
            "  {:<8} {:<30} {}/{} free ({} occupied, {} expected)",
            locker.identifier(),
            locker.address(),
            availability.available,
            availability.total,
            availability.occupied,
            availability.expected
        );
        if availability.balance() < 0 {
            tracing::warn!(
                "Locker {} is overbooked by {}",
                locker.identifier(),
                -availability.balance()
            );
        }
    }

    if let Some(dir) = &args.report {
        let report = NetworkReport::capture(&network, date)?;
        let storage = LocalStorage::new(dir.as_str());
        let file = report.write_bundle(&storage)?;
        println!("📁 Report saved to: {}/{}", storage.base_path(), file);
    }

    Ok(())
}

fn print_summary(config: &NetworkConfig) {
    let name = config
        .network
        .as_ref()
        .map(|n| n.name.as_str())
        .unwrap_or("-");
    let lockers = config.all_lockers();
    let slots: usize = lockers.iter().map(|l| l.slots.len()).sum();

    println!("🔍 Dry run for network '{}'", name);
    println!("  lockers:    {}", lockers.len());
    println!("  slots:      {}", slots);
    println!("  facilities: {}", config.all_facilities().len());
    println!("  groups:     {}", config.groups.len());
    println!("  courier:    {}", config.courier.name);
}

/// Registers one parcel at the first locker and routes it to another one,
/// through a storage facility when the network has one.
fn run_demo(config: &NetworkConfig, network: &mut LockerNetwork) -> anyhow::Result<()> {
    let desk = config.build_desk(TracingNotifier);
    let mut courier = config.build_coordinator(TracingNotifier);

    let lockers: Vec<(String, Vec<_>)> = network
        .lockers()
        .iter()
        .map(|l| {
            let free: Vec<_> = l
                .slots()
                .iter()
                .filter(|s| !s.is_occupied())
                .map(|s| s.size())
                .collect();
            (l.identifier().to_string(), free)
        })
        .collect();

    let Some((sender_locker, size, delivery_locker)) =
        lockers.iter().find_map(|(from, sizes)| {
            sizes.iter().find_map(|size| {
                lockers
                    .iter()
                    .find(|(to, free)| to != from && free.contains(size))
                    .map(|(to, _)| (from.clone(), *size, to.clone()))
            })
        })
    else {
        tracing::warn!("Demo needs two lockers with a free slot of the same size; skipping");
        return Ok(());
    };

    let parcel_id = desk.register(
        network,
        RegistrationRequest {
            sender: Contact::new("Alice", "555-0100"),
            recipient: Contact::new("Bob", "555-0199").with_email("bob@example.com"),
            size,
            services: vec![Service::Insurance],
            sender_locker: sender_locker.clone(),
            delivery_locker: delivery_locker.clone(),
        },
    )?;
    let key = parcel_id.to_string();
    let receipt = desk.pay(network, &key)?;
    println!(
        "Registered parcel {} (size {}), fee {}, code {}",
        parcel_id, size, receipt.fee, receipt.temp_code
    );
    desk.deposit(network, &key, "555-0100")?;

    let mut stops = vec![LocationId::Locker(sender_locker)];
    if let Some(facility) = network.facilities().first() {
        stops.push(LocationId::Facility(facility.name().to_string()));
    }
    stops.push(LocationId::Locker(delivery_locker));

    let legs = courier
        .route(network, &stops, &key)
        .map_err(LockerError::from)?;
    for leg in &legs {
        println!("  {} -> {} by {}", leg.from, leg.to, leg.courier);
    }

    for event in desk.track(network, &key)? {
        println!(
            "  {}  {:<22} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.kind.to_string(),
            event.location
        );
    }
    Ok(())
}
