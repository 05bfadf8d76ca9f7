use kinline::*;

use clap::{App, Arg};
use std::fs;

fn main() -> Result<(), jvm::Error> {
    env_logger::init();

    let matches = App::new("Inline method dumper")
        .version("0.1.0")
        .about("Loads a method out of a class file and prints its instruction list")
        .arg(
            Arg::with_name("method")
                .long("method")
                .value_name("NAME")
                .help("Name of the method to load")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("descriptor")
                .long("descriptor")
                .value_name("DESC")
                .help("JVM descriptor of the method, e.g. (I)V")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("no-debug")
                .long("no-debug")
                .help("Skip debug attributes while loading"),
        )
        .arg(
            Arg::with_name("INPUT")
                .help("Sets the input class file to use")
                .required(true)
                .index(1),
        )
        .get_matches();

    let class_file = matches.value_of("INPUT").unwrap();
    let method_name = matches.value_of("method").unwrap();
    let descriptor = matches.value_of("descriptor").unwrap();
    let settings = inline::InlineSettings {
        generate_source_maps: !matches.is_present("no-debug"),
        ..inline::InlineSettings::default()
    };

    log::info!("Reading '{}'", class_file);
    let class_bytes = fs::read(class_file).map_err(jvm::Error::IoError)?;

    let internal_name = class_file.trim_end_matches(".class");
    let loaded =
        inline::loader::load_method(&class_bytes, method_name, descriptor, internal_name, &settings)?;

    print!("{}", inline::textify::body_text(&loaded.body));
    for file in loaded.source_map.file_mappings() {
        log::info!("Source map file: {} ({})", file.name, file.path);
    }

    Ok(())
}
