mod datefmt;
mod menu;
mod quiz;
mod results;
mod settings;

use std::io::ErrorKind;
use std::sync::Arc;

use chrono::Local;
use dotenv::dotenv;
use teloxide::prelude::*;
use teloxide::types::{InputFile, User};
use teloxide::utils::command::BotCommands;

use quiz::controller::{self, EndCause, QuizContext};
use quiz::event::{QuizAction, EXIT_PHRASE};
use results::ResultStore;
use settings::Settings;

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    Start,
    Download,
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting forum quiz bot...");

    let bot = Bot::from_env();

    let settings = Arc::new(Settings::from_env());
    let ctx = QuizContext {
        results: Arc::new(ResultStore::new(
            settings.results_path.clone(),
            settings.csv_path.clone(),
        )),
        sessions: quiz::session::SessionRegistry::new(),
        settings,
    };

    Dispatcher::builder(
        bot,
        dptree::entry()
            .branch(
                Update::filter_message()
                    .filter_command::<Command>()
                    .endpoint(on_command),
            )
            .branch(Update::filter_message().endpoint(on_message))
            .branch(Update::filter_callback_query().endpoint(on_callback)),
    )
    .dependencies(dptree::deps![ctx])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;
}

const EMPTY_CONFIG_ERROR: &str = "Ошибка: конфигурация пуста или некорректна.";

async fn on_command(bot: Bot, ctx: QuizContext, msg: Message, cmd: Command) -> HandlerResult {
    let Some(user) = msg.from() else {
        return Ok(());
    };
    match cmd {
        Command::Start => {
            let tree = menu::load_navigation(&ctx.settings.navigation_path).await;
            if tree.is_empty() {
                bot.send_message(msg.chat.id, EMPTY_CONFIG_ERROR).await?;
                return Ok(());
            }
            let markup = menu::adaptive_keyboard(
                &menu::first_level_items(&tree),
                false,
                ctx.settings.show_quiz_button,
            );
            bot.send_message(
                msg.chat.id,
                format!(
                    "Добро пожаловать, {}! Используйте кнопки меню для навигации. Выберите опцию для продолжения.",
                    display_name(user)
                ),
            )
            .reply_markup(markup)
            .await?;
        }
        Command::Download => download_results(&bot, &ctx, &msg, user).await?,
    }
    Ok(())
}

fn display_name(user: &User) -> &str {
    if !user.first_name.is_empty() {
        &user.first_name
    } else {
        user.username.as_deref().unwrap_or("Пользователь")
    }
}

/// Streams the CSV export to an allow-listed admin. A missing file and any
/// other delivery failure produce distinct replies.
async fn download_results(bot: &Bot, ctx: &QuizContext, msg: &Message, user: &User) -> HandlerResult {
    if !ctx.settings.is_admin(user.id) {
        bot.send_message(msg.chat.id, "⛔ У вас нет прав для скачивания результатов.")
            .await?;
        return Ok(());
    }

    match tokio::fs::metadata(ctx.results.csv_path()).await {
        Ok(_) => {
            let file_name = format!("Quiz_Results_{}.csv", datefmt::format_date(&Local::now()));
            let document =
                InputFile::file(ctx.results.csv_path().to_path_buf()).file_name(file_name);
            if let Err(err) = bot
                .send_document(msg.chat.id, document)
                .caption("📊 Результаты викторины. Для возврата — команда /start")
                .await
            {
                log::error!("failed to send results file to admin {}: {err}", user.id);
                bot.send_message(msg.chat.id, "❌ Ошибка при отправке файла.")
                    .await?;
            }
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            bot.send_message(msg.chat.id, "⚠️ Файл результатов не найден.")
                .await?;
        }
        Err(err) => {
            log::error!("failed to stat results file: {err}");
            bot.send_message(msg.chat.id, "❌ Ошибка при отправке файла.")
                .await?;
        }
    }
    Ok(())
}

async fn on_message(bot: Bot, ctx: QuizContext, msg: Message) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(user) = msg.from().cloned() else {
        return Ok(());
    };

    let tree = menu::load_navigation(&ctx.settings.navigation_path).await;
    if tree.is_empty() {
        bot.send_message(msg.chat.id, EMPTY_CONFIG_ERROR).await?;
        return Ok(());
    }

    if text == menu::QUIZ_BUTTON && ctx.settings.show_quiz_button {
        if let Some(rejection) = controller::start_quiz(&bot, &ctx, &user, msg.chat.id).await? {
            let markup = menu::adaptive_keyboard(
                &menu::first_level_items(&tree),
                false,
                ctx.settings.show_quiz_button,
            );
            bot.send_message(msg.chat.id, rejection.to_string())
                .reply_markup(markup)
                .await?;
        }
        return Ok(());
    }

    if text == menu::MY_RESULTS_BUTTON {
        let stored = ctx.results.user_results(user.id).await;
        let markup = menu::adaptive_keyboard(
            &menu::first_level_items(&tree),
            false,
            ctx.settings.show_quiz_button,
        );
        let reply = if stored.is_empty() {
            "У вас пока нет результатов викторины. Пройдите викторину, чтобы увидеть свои результаты!"
                .to_string()
        } else {
            results::render_history(&stored)
        };
        bot.send_message(msg.chat.id, reply).reply_markup(markup).await?;
        return Ok(());
    }

    if text == EXIT_PHRASE {
        controller::end_quiz(&bot, &ctx, user.id, EndCause::ManualExit).await?;
        return Ok(());
    }

    // Nickname input and free-text answers take priority over navigation.
    if controller::handle_text(&bot, &ctx, &user, msg.chat.id, text).await? {
        return Ok(());
    }

    if let Some(subs) = menu::sub_items(&tree, text) {
        bot.send_message(msg.chat.id, "Выберите подопцию:")
            .reply_markup(menu::adaptive_keyboard(&subs, true, ctx.settings.show_quiz_button))
            .await?;
    } else if text == menu::BACK_BUTTON {
        let markup = menu::adaptive_keyboard(
            &menu::first_level_items(&tree),
            false,
            ctx.settings.show_quiz_button,
        );
        bot.send_message(msg.chat.id, "Выберите опцию:")
            .reply_markup(markup)
            .await?;
    } else if let Some(leaf) = menu::find_leaf_text(&tree, text) {
        bot.send_message(msg.chat.id, leaf)
            .reply_markup(menu::adaptive_keyboard(&[], true, ctx.settings.show_quiz_button))
            .await?;
    } else {
        bot.send_message(msg.chat.id, "Для начала работы с ботом, используйте команду /start")
            .await?;
    }
    Ok(())
}

async fn on_callback(bot: Bot, ctx: QuizContext, q: CallbackQuery) -> HandlerResult {
    let user = q.from.clone();
    let (Some(data), Some(chat_id)) = (q.data.as_deref(), q.message.as_ref().map(|m| m.chat.id))
    else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    let handled = match QuizAction::decode(data, user.id) {
        Some(action) => {
            match controller::handle_action(&bot, &ctx, &user, chat_id, action).await {
                Ok(handled) => handled,
                Err(err) => {
                    log::error!("callback handling failed for user {}: {err}", user.id);
                    bot.answer_callback_query(q.id)
                        .text("Произошла ошибка. Пожалуйста, попробуйте снова.")
                        .await?;
                    return Ok(());
                }
            }
        }
        None => false,
    };

    if handled || !ctx.sessions.contains(user.id) {
        bot.answer_callback_query(q.id).await?;
    } else {
        bot.answer_callback_query(q.id)
            .text("Ошибка обработки ответа. Попробуйте снова.")
            .await?;
    }
    Ok(())
}
