use actform::{Config, Diagram, EngineBuilder, GraphModel, Template};
use tracing_subscriber::EnvFilter;

fn template(
    id: &str,
    detector: &str,
    replacement: &str,
) -> Template {
    let detector = GraphModel::from_json(detector).unwrap();
    let replacement = GraphModel::from_json(replacement).unwrap();
    Template::new(id, &detector, &replacement).unwrap()
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load_from_str(include_str!("./config.toml")).unwrap();

    let templates = vec![
        template("circuit-execution", include_str!("./execution_detector.json"), include_str!("./execution_replacement.json")),
        template("readout-mitigation", include_str!("./mitigation_detector.json"), include_str!("./mitigation_replacement.json")),
    ];

    let engine = EngineBuilder::new().config(config).templates(templates).build().unwrap();

    engine.channel().on_notify(|pass, message| {
        println!("[{}] {}", pass, message);
    });

    engine.channel().on_relayout(|_, root| {
        println!("Relayout requested for {}", root);
    });

    let mut diagram = Diagram::from_json(include_str!("./process.json")).unwrap();
    println!("{}\n", diagram.schema());

    let report = engine.transform_blocking(&mut diagram).unwrap();
    for task in report.tasks.iter() {
        println!("{} -> {:?} ({})", task.task_id, task.root, task.status.as_ref());
    }

    match report.into_result() {
        Ok(_) => println!("\n{}", diagram.schema()),
        Err(e) => println!("Transformation failed: {}", e),
    }
    // handlers run on the channel listener
    std::thread::sleep(std::time::Duration::from_millis(100));
}
