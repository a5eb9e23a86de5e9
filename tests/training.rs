use snake_evo::{
    Activation, Arena, Dir, FitnessSettings, GaContext, GaParams, Game, Pos, Population, Trainer,
    TrainingConfig, run_episode,
};

fn quick_config(seed: u64) -> TrainingConfig {
    TrainingConfig {
        population_size: 20,
        hidden_layers: vec![8],
        seed: Some(seed),
        threads: Some(2),
        fitness: FitnessSettings {
            max_steps: 400,
            ..FitnessSettings::default()
        },
        ..TrainingConfig::default()
    }
}

#[test]
fn fittest_genome_survives_as_champion() {
    let mut pop = Population::new(4, &[11, 8, 3], GaContext::seeded(GaParams::default(), 99)).unwrap();
    let best = pop.brain(1).unwrap().genes();
    for (i, f) in [10.0, 50.0, 5.0, 20.0].into_iter().enumerate() {
        pop.set_fitness(i, f).unwrap();
    }

    pop.evolve().unwrap();

    assert_eq!(pop.len(), 4);
    assert_eq!(pop.generation(), 1);
    assert_eq!(pop.best_fitness(), 50.0);
    assert_eq!(pop.champion().genes(), best);
    assert!(pop.fitness().iter().all(|&f| f == 0.0));
}

#[test]
fn seeded_training_run() {
    let mut trainer = Trainer::new(quick_config(2024)).unwrap();
    trainer.run(3).unwrap();

    let history = trainer.history();
    assert_eq!(history.len(), 3);
    for (i, stats) in history.iter().enumerate() {
        assert_eq!(stats.generation, i);
        assert!(stats.best_fitness >= stats.average_fitness);
        assert!(stats.average_fitness >= 1.0);
        assert_eq!(stats.topology, vec![11, 8, 3]);
    }
    assert_eq!(trainer.population().generation(), 3);
    assert_eq!(trainer.population().len(), 20);
}

#[test]
fn champion_replays_identically() {
    let mut trainer = Trainer::new(quick_config(8)).unwrap();
    trainer.run(2).unwrap();

    let champion = trainer.population().champion();
    let settings = trainer.config().fitness;
    let a = run_episode(champion.topology(), Activation::Relu, &champion.genes(), &settings, 77).unwrap();
    let b = run_episode(champion.topology(), Activation::Relu, &champion.genes(), &settings, 77).unwrap();
    assert_eq!(a, b);
    assert!(a.steps <= settings.max_steps);
}

#[test]
fn config_from_json_drives_trainer() {
    let json = r#"{
        "population_size": 6,
        "hidden_layers": [],
        "seed": 1,
        "threads": 1,
        "fitness": { "max_steps": 100 }
    }"#;
    let config: TrainingConfig = serde_json::from_str(json).unwrap();
    let mut trainer = Trainer::new(config).unwrap();
    let stats = trainer.step_generation().unwrap();
    assert_eq!(stats.topology, vec![11, 3]);
    assert!(stats.best_fitness <= 100.0 + stats.best_food as f64 * 1000.0);
}

#[test]
fn wall_ends_game_without_moving() {
    let arena = Arena::default();
    let body = [Pos::new(0, 0), Pos::new(1, 0), Pos::new(2, 0)];
    let mut game = Game::from_body(arena, &body, Dir::Left, 3).unwrap();

    assert!(!game.tick());
    assert!(game.is_terminated());
    assert_eq!(game.head(), Pos::new(0, 0));
    assert_eq!(game.body().len(), 3);
    assert_eq!(game.score(), 0);
}

#[test]
fn human_controls_cannot_reverse() {
    let mut game = Game::with_seed(Arena::default(), 11);
    let start = game.head();
    game.change_dir(Dir::Left);
    assert_eq!(game.dir(), Dir::Right);
    game.change_dir(Dir::Up);
    game.tick();
    assert_eq!(game.head(), Pos::new(start.x, start.y - 1));
}
