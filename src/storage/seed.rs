// 演示数据填充 - 首次运行时初始化账号与题库

use super::models::*;
use super::Database;
use anyhow::Result;
use tracing::info;

/// 填充演示数据（幂等：已存在的账号和分类会被跳过）
pub async fn seed_demo_data(db: &Database) -> Result<()> {
    info!("开始填充演示数据");

    // 演示账号
    let admin_id = ensure_user(db, "admin", "admin123", "admin").await?;
    let user_id = ensure_user(db, "demo", "demo123", "user").await?;
    info!("演示账号就绪: admin={}, demo={}", admin_id, user_id);

    // 演示分类与题目
    let geography = ensure_category(db, "地理", "世界地理常识").await?;
    let science = ensure_category(db, "科学", "自然科学基础").await?;
    let history = ensure_category(db, "历史", "中外历史事件").await?;

    let seeded = [
        seed_question(
            db,
            geography,
            "中国的首都是哪座城市？",
            1,
            "北京",
            &["上海", "广州", "南京"],
        )
        .await?,
        seed_question(
            db,
            geography,
            "世界上面积最大的海洋是？",
            1,
            "太平洋",
            &["大西洋", "印度洋", "北冰洋"],
        )
        .await?,
        seed_question(
            db,
            geography,
            "尼罗河主要流经哪个大洲？",
            2,
            "非洲",
            &["亚洲", "欧洲", "南美洲"],
        )
        .await?,
        seed_question(
            db,
            science,
            "水的化学式是什么？",
            1,
            "H2O",
            &["CO2", "O2", "NaCl"],
        )
        .await?,
        seed_question(
            db,
            science,
            "光在真空中的传播速度约为每秒多少公里？",
            2,
            "30万公里",
            &["3万公里", "300万公里", "3000公里"],
        )
        .await?,
        seed_question(
            db,
            science,
            "人体中数量最多的细胞是？",
            3,
            "红细胞",
            &["白细胞", "神经细胞", "肌肉细胞"],
        )
        .await?,
        seed_question(
            db,
            history,
            "秦始皇统一六国是在公元前哪一年？",
            2,
            "公元前221年",
            &["公元前206年", "公元前256年", "公元前300年"],
        )
        .await?,
        seed_question(
            db,
            history,
            "第二次世界大战结束于哪一年？",
            1,
            "1945年",
            &["1939年", "1944年", "1950年"],
        )
        .await?,
    ];

    let inserted = seeded.iter().filter(|s| **s).count();
    info!("演示数据填充完成，新增 {} 道题目", inserted);
    Ok(())
}

/// 确保账号存在，返回用户 ID
async fn ensure_user(db: &Database, username: &str, password: &str, role: &str) -> Result<i64> {
    if let Some(existing) = db.get_user_by_username(username).await? {
        return existing
            .id
            .ok_or_else(|| anyhow::anyhow!("用户记录缺少 ID"));
    }

    let user = User {
        id: None,
        username: username.to_string(),
        password_hash: crate::auth::hash_password(password)?,
        role: role.to_string(),
        created_at: None,
    };
    db.insert_user(&user).await
}

/// 确保分类存在，返回分类 ID
async fn ensure_category(db: &Database, name: &str, description: &str) -> Result<i64> {
    if let Some(existing) = db.get_category_by_name(name).await? {
        return existing
            .id
            .ok_or_else(|| anyhow::anyhow!("分类记录缺少 ID"));
    }

    db.insert_category(&Category::new(name, description)).await
}

/// 插入一道演示题目，题干重复时跳过，返回是否新增
async fn seed_question(
    db: &Database,
    category_id: i64,
    prompt: &str,
    difficulty: i64,
    correct: &str,
    wrong: &[&str],
) -> Result<bool> {
    let existing = db.get_questions_by_category(category_id).await?;
    if existing.iter().any(|d| d.question.prompt == prompt) {
        return Ok(false);
    }

    let question = Question {
        id: None,
        category_id,
        prompt: prompt.to_string(),
        difficulty,
        created_at: None,
    };

    let mut answers = vec![Answer {
        id: None,
        question_id: 0,
        text: correct.to_string(),
        is_correct: true,
    }];
    for text in wrong {
        answers.push(Answer {
            id: None,
            question_id: 0,
            text: text.to_string(),
            is_correct: false,
        });
    }

    db.insert_question(&question, &answers).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("seed_test.db");
        let db = Database::new_sqlite(db_path.to_str().unwrap()).await.unwrap();

        seed_demo_data(&db).await.unwrap();
        let stats_first = db.get_dashboard_stats().await.unwrap();

        seed_demo_data(&db).await.unwrap();
        let stats_second = db.get_dashboard_stats().await.unwrap();

        assert_eq!(stats_first.user_count, stats_second.user_count);
        assert_eq!(stats_first.question_count, stats_second.question_count);
        assert!(stats_first.question_count >= 8);

        let admin = db.get_user_by_username("admin").await.unwrap().unwrap();
        assert!(admin.is_admin());
    }
}
